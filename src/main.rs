//! PulseMap — Binary Entrypoint
//! Boots the Axum HTTP server: loads config, wires the store, geocoder, and
//! source providers, and exposes the pipeline trigger routes plus /metrics.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pulsemap::api::{create_router, AppState};
use pulsemap::config::AppConfig;
use pulsemap::geocode::CountryGeocoder;
use pulsemap::ingest::providers::reliefweb::ReliefWebSource;
use pulsemap::ingest::providers::who::WhoDonSource;
use pulsemap::ingest::types::ReportSource;
use pulsemap::metrics::Metrics;
use pulsemap::store::memory::MemoryStore;
use pulsemap::store::postgres::PgOutbreakStore;
use pulsemap::store::OutbreakStore;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::load().context("loading configuration")?;

    let metrics = Metrics::init();

    let store: Arc<dyn OutbreakStore> = match cfg.database_url.as_deref() {
        Some(url) => {
            let pg = PgOutbreakStore::connect(url).await?;
            pg.ensure_schema().await?;
            tracing::info!("store: postgres");
            Arc::new(pg)
        }
        None => {
            tracing::warn!("store: in-memory (no DATABASE_URL set; state is not persisted)");
            Arc::new(MemoryStore::new())
        }
    };

    let geocoder = Arc::new(CountryGeocoder::new(cfg.mapbox_token.clone()));
    let who = Arc::new(WhoDonSource::from_url(cfg.who_api_url.clone()));
    let sources: Vec<Arc<dyn ReportSource>> = vec![
        who.clone(),
        Arc::new(ReliefWebSource::new(cfg.reliefweb_appname.clone())),
    ];

    let state = AppState {
        store,
        geocoder,
        who,
        sources: Arc::new(sources),
        cron_secret: cfg.cron_secret.clone(),
    };

    let app = create_router(state).merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr)
        .await
        .with_context(|| format!("binding {}", cfg.bind_addr))?;
    tracing::info!(addr = %cfg.bind_addr, "pulsemap listening");

    axum::serve(listener, app).await.context("serving http")?;
    Ok(())
}
