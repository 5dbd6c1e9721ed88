// src/api.rs
//! HTTP trigger surface. Thin glue: auth check, date validation, JSON run
//! summaries. All real work happens in `ingest` + `pipeline`.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use metrics::{gauge, histogram};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::geocode::Geocode;
use crate::ingest::providers::who::WhoDonSource;
use crate::ingest::types::ReportSource;
use crate::ingest::{fetch_all, SourceTally};
use crate::pipeline::process_reports;
use crate::store::OutbreakStore;

const BACKFILL_DEFAULT_LIMIT: usize = 200;
const BACKFILL_MAX_LIMIT: usize = 500;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn OutbreakStore>,
    pub geocoder: Arc<dyn Geocode>,
    /// Kept separately from `sources` for the date-range backfill queries.
    pub who: Arc<WhoDonSource>,
    pub sources: Arc<Vec<Arc<dyn ReportSource>>>,
    pub cron_secret: Option<String>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/pipeline/run", get(run_pipeline))
        .route("/pipeline/backfill", post(backfill))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Bearer-secret gate: open when no secret is configured (matches the
/// original deployment), otherwise the header must be exactly `Bearer <secret>`.
fn authorized(secret: Option<&str>, headers: &HeaderMap) -> bool {
    let Some(secret) = secret else { return true };
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .map(|h| h == format!("Bearer {secret}"))
        .unwrap_or(false)
}

fn unauthorized() -> (StatusCode, Json<Value>) {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" })))
}

fn source_counts(tallies: &[SourceTally]) -> Value {
    let mut map = serde_json::Map::new();
    for t in tallies {
        map.insert(t.name.to_lowercase(), json!(t.fetched));
    }
    Value::Object(map)
}

async fn run_pipeline(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    if !authorized(state.cron_secret.as_deref(), &headers) {
        return unauthorized();
    }

    let t0 = Instant::now();
    tracing::info!("pipeline: starting outbreak data update");

    let (reports, tallies) = fetch_all(&state.sources).await;
    tracing::info!(total = reports.len(), "pipeline: fetched reports");

    match process_reports(state.store.as_ref(), state.geocoder.as_ref(), &reports).await {
        Ok(summary) => {
            finish_run_metrics(t0);
            let body = json!({
                "success": true,
                "duration": format!("{:.1}s", t0.elapsed().as_secs_f64()),
                "sources": source_counts(&tallies),
                "results": summary,
                "timestamp": Utc::now().to_rfc3339(),
            });
            tracing::info!(summary = %body, "pipeline: complete");
            (StatusCode::OK, Json(body))
        }
        Err(e) => {
            tracing::error!(error = ?e, "pipeline: failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "duration": format!("{:.1}s", t0.elapsed().as_secs_f64()),
                    "error": e.to_string(),
                    "timestamp": Utc::now().to_rfc3339(),
                })),
            )
        }
    }
}

#[derive(Debug, Deserialize)]
struct BackfillRequest {
    start_date: String,
    end_date: String,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    limit: Option<usize>,
}

async fn backfill(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<BackfillRequest>,
) -> (StatusCode, Json<Value>) {
    if !authorized(state.cron_secret.as_deref(), &headers) {
        return unauthorized();
    }

    let bad_request = |msg: &str| {
        (StatusCode::BAD_REQUEST, Json(json!({ "error": msg })))
    };

    let Ok(start) = NaiveDate::parse_from_str(&req.start_date, "%Y-%m-%d") else {
        return bad_request("Invalid date format. Use YYYY-MM-DD");
    };
    let Ok(end) = NaiveDate::parse_from_str(&req.end_date, "%Y-%m-%d") else {
        return bad_request("Invalid date format. Use YYYY-MM-DD");
    };
    if start > end {
        return bad_request("start_date must be before end_date");
    }

    let source = req.source.as_deref().unwrap_or("who");
    if source != "who" && source != "all" {
        return bad_request("Unsupported source. Available: who, all");
    }

    let limit = req
        .limit
        .unwrap_or(BACKFILL_DEFAULT_LIMIT)
        .clamp(1, BACKFILL_MAX_LIMIT);

    let t0 = Instant::now();
    tracing::info!(%start, %end, limit, "backfill: fetching");

    let reports = match state.who.fetch_range(start, end, limit).await {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(error = ?e, "backfill: fetch failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "error": e.to_string(),
                    "timestamp": Utc::now().to_rfc3339(),
                })),
            );
        }
    };

    match process_reports(state.store.as_ref(), state.geocoder.as_ref(), &reports).await {
        Ok(summary) => {
            finish_run_metrics(t0);
            (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "duration": format!("{:.1}s", t0.elapsed().as_secs_f64()),
                    "query": {
                        "start_date": req.start_date,
                        "end_date": req.end_date,
                        "source": source,
                        "limit": limit,
                    },
                    "fetched": reports.len(),
                    "results": summary,
                    "timestamp": Utc::now().to_rfc3339(),
                })),
            )
        }
        Err(e) => {
            tracing::error!(error = ?e, "backfill: merge failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "duration": format!("{:.1}s", t0.elapsed().as_secs_f64()),
                    "error": e.to_string(),
                    "timestamp": Utc::now().to_rfc3339(),
                })),
            )
        }
    }
}

fn finish_run_metrics(t0: Instant) {
    histogram!("pipeline_run_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    gauge!("pipeline_last_run_ts").set(Utc::now().timestamp() as f64);
}
