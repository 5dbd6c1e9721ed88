// src/config.rs
//! Runtime configuration, resolved once at startup and handed to the
//! constructors that need it. Business logic never reads the environment.
//!
//! Precedence: environment variables > optional TOML file > defaults.
//! The TOML file lives at `config/pulsemap.toml` unless PULSEMAP_CONFIG_PATH
//! points elsewhere.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::ingest::providers::who::DEFAULT_WHO_API_URL;

pub const ENV_CONFIG_PATH: &str = "PULSEMAP_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/pulsemap.toml";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// WHO Disease Outbreak News OData endpoint.
    pub who_api_url: String,
    /// Registered ReliefWeb appname; the ReliefWeb source is inactive without one.
    pub reliefweb_appname: Option<String>,
    /// Postgres connection string; the in-memory store is used when absent.
    pub database_url: Option<String>,
    /// Mapbox token for geocoding countries outside the built-in gazetteer.
    pub mapbox_token: Option<String>,
    /// Shared secret for the pipeline trigger routes. No secret = open.
    pub cron_secret: Option<String>,
    pub bind_addr: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            who_api_url: DEFAULT_WHO_API_URL.to_string(),
            reliefweb_appname: None,
            database_url: None,
            mapbox_token: None,
            cron_secret: None,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

impl AppConfig {
    /// Resolve configuration from the default file location + environment.
    pub fn load() -> Result<Self> {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        let mut cfg = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        cfg.apply_env();
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("WHO_API_URL") {
            self.who_api_url = v;
        }
        if let Ok(v) = std::env::var("RELIEFWEB_APPNAME") {
            self.reliefweb_appname = Some(v);
        }
        if let Ok(v) = std::env::var("DATABASE_URL") {
            self.database_url = Some(v);
        }
        if let Ok(v) = std::env::var("MAPBOX_TOKEN") {
            self.mapbox_token = Some(v);
        }
        if let Ok(v) = std::env::var("CRON_SECRET") {
            self.cron_secret = Some(v);
        }
        if let Ok(v) = std::env::var("BIND_ADDR") {
            self.bind_addr = v;
        }
    }
}
