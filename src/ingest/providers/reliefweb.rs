// src/ingest/providers/reliefweb.rs
//! ReliefWeb provider. The API requires a registered appname
//! (<https://apidoc.reliefweb.int/parameters#appname>); without one this
//! provider stays inactive and yields no reports, leaving the WHO feed as the
//! primary source.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::classify::{estimate_severity, extract_disease};
use crate::ingest::types::{RawReport, ReportSource, SourceType};
use crate::ingest::{normalize_summary, truncate_chars, SUMMARY_MAX_CHARS};

const RELIEFWEB_API_URL: &str = "https://api.reliefweb.int/v1/reports";
const PAGE_LIMIT: usize = 20;

#[derive(Debug, Deserialize)]
struct RwPage {
    #[serde(default)]
    data: Vec<RwEntry>,
}

#[derive(Debug, Deserialize)]
struct RwEntry {
    fields: RwFields,
}

#[derive(Debug, Deserialize)]
struct RwFields {
    title: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    date: Option<RwDate>,
    #[serde(default)]
    primary_country: Option<RwCountry>,
}

#[derive(Debug, Deserialize)]
struct RwDate {
    #[serde(default)]
    created: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RwCountry {
    name: String,
}

pub struct ReliefWebSource {
    mode: Mode,
}

enum Mode {
    /// No registered appname; the provider is a no-op.
    Disabled,
    Fixture(String),
    Http {
        appname: String,
        client: reqwest::Client,
    },
}

impl ReliefWebSource {
    pub fn new(appname: Option<String>) -> Self {
        let mode = match appname {
            Some(name) if !name.trim().is_empty() => Mode::Http {
                appname: name,
                client: reqwest::Client::new(),
            },
            _ => Mode::Disabled,
        };
        Self { mode }
    }

    pub fn from_fixture_str(json: &str) -> Self {
        Self {
            mode: Mode::Fixture(json.to_string()),
        }
    }
}

#[async_trait]
impl ReportSource for ReliefWebSource {
    async fn fetch_latest(&self) -> Result<Vec<RawReport>> {
        match &self.mode {
            Mode::Disabled => {
                tracing::info!("ReliefWeb: skipped (no registered appname); WHO is the primary source");
                Ok(Vec::new())
            }
            Mode::Fixture(json) => parse_reliefweb_page(json),
            Mode::Http { appname, client } => {
                let limit = PAGE_LIMIT.to_string();
                let body = client
                    .get(RELIEFWEB_API_URL)
                    .query(&[
                        ("appname", appname.as_str()),
                        ("query[value]", "epidemic OR outbreak"),
                        ("limit", limit.as_str()),
                        ("fields[include][]", "title"),
                        ("fields[include][]", "url"),
                        ("fields[include][]", "body"),
                        ("fields[include][]", "date.created"),
                        ("fields[include][]", "primary_country.name"),
                        ("sort[]", "date.created:desc"),
                    ])
                    .send()
                    .await
                    .context("reliefweb get()")?
                    .error_for_status()
                    .context("reliefweb status")?
                    .text()
                    .await
                    .context("reliefweb .text()")?;
                parse_reliefweb_page(&body)
            }
        }
    }

    fn name(&self) -> &'static str {
        "ReliefWeb"
    }
}

fn parse_reliefweb_page(json: &str) -> Result<Vec<RawReport>> {
    let page: RwPage = serde_json::from_str(json).context("parsing reliefweb json")?;

    let mut out = Vec::with_capacity(page.data.len());
    for entry in page.data {
        let f = entry.fields;
        let disease = extract_disease(&f.title);
        // ReliefWeb tags the country explicitly; no title convention needed.
        let country = f
            .primary_country
            .map(|c| c.name)
            .unwrap_or_else(|| crate::classify::UNKNOWN_COUNTRY.to_string());
        let summary = normalize_summary(f.body.as_deref().unwrap_or_default());
        let severity = estimate_severity(&f.title, &summary);

        out.push(RawReport {
            disease_name: disease.to_string(),
            country,
            region: None,
            title: f.title,
            summary: truncate_chars(&summary, SUMMARY_MAX_CHARS),
            url: f.url,
            source_type: SourceType::News,
            source_name: "ReliefWeb".to_string(),
            published_at: f
                .date
                .and_then(|d| d.created)
                .and_then(|ts| DateTime::parse_from_rfc3339(&ts).ok())
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or(DateTime::UNIX_EPOCH),
            severity_hint: Some(severity),
            case_count: None,
        });
    }

    tracing::info!(parsed = out.len(), "ReliefWeb: parsed reports");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_provider_yields_nothing() {
        let src = ReliefWebSource::new(None);
        let out = src.fetch_latest().await.unwrap();
        assert!(out.is_empty());

        let src = ReliefWebSource::new(Some("  ".to_string()));
        assert!(src.fetch_latest().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn fixture_entries_are_classified() {
        let json = r#"{"data":[{"fields":{
            "title":"Cholera outbreak response - Haiti",
            "url":"https://reliefweb.int/report/x",
            "body":"<p>Deaths reported in three departments.</p>",
            "date":{"created":"2025-02-01T12:00:00+00:00"},
            "primary_country":{"name":"Haiti"}
        }}]}"#;
        let src = ReliefWebSource::from_fixture_str(json);
        let out = src.fetch_latest().await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].disease_name, "Cholera");
        assert_eq!(out[0].country, "Haiti");
        assert_eq!(out[0].source_type, SourceType::News);
        assert_eq!(out[0].severity_hint, Some(crate::ingest::types::Severity::Critical));
    }
}
