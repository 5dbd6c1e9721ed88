// src/ingest/providers/who.rs
//! WHO Disease Outbreak News (DON) provider.
//!
//! Pulls the DON OData feed, classifies each bulletin by disease, country,
//! and severity, and emits [`RawReport`]s. Bulletins whose extracted country
//! is "Global" never leave this provider.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use metrics::{counter, histogram};
use serde::Deserialize;

use crate::classify::{estimate_severity, extract_country, extract_disease, GLOBAL_COUNTRY};
use crate::ingest::types::{RawReport, ReportSource, SourceType};
use crate::ingest::{normalize_summary, truncate_chars, SUMMARY_MAX_CHARS};

pub const DEFAULT_WHO_API_URL: &str = "https://www.who.int/api/hubs/diseaseoutbreaknews";

const USER_AGENT: &str = "PulseMap/1.0 (health-surveillance-dashboard)";
const SELECT_FIELDS: &str = "DonId,Title,PublicationDate,Summary,UrlName";
const LATEST_PAGE_SIZE: usize = 50;

#[derive(Debug, Deserialize)]
struct DonPage {
    #[serde(default)]
    value: Vec<DonItem>,
}

#[derive(Debug, Deserialize)]
struct DonItem {
    #[serde(rename = "DonId")]
    #[allow(dead_code)]
    don_id: Option<String>,
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "PublicationDate")]
    publication_date: Option<String>,
    #[serde(rename = "Summary")]
    summary: Option<String>,
    #[serde(rename = "UrlName")]
    url_name: Option<String>,
}

pub struct WhoDonSource {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        base_url: String,
        client: reqwest::Client,
    },
}

impl WhoDonSource {
    pub fn from_url(base_url: impl Into<String>) -> Self {
        Self {
            mode: Mode::Http {
                base_url: base_url.into(),
                client: reqwest::Client::new(),
            },
        }
    }

    /// Parse a captured DON page instead of hitting the network. Used by tests.
    pub fn from_fixture_str(json: &str) -> Self {
        Self {
            mode: Mode::Fixture(json.to_string()),
        }
    }

    /// Backfill query: bulletins published inside `[start, end]`, newest
    /// first, capped at `limit`.
    pub async fn fetch_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        limit: usize,
    ) -> Result<Vec<RawReport>> {
        match &self.mode {
            Mode::Fixture(json) => parse_don_page(json),
            Mode::Http { base_url, client } => {
                let filter = format!(
                    "PublicationDate ge {start}T00:00:00Z and PublicationDate le {end}T23:59:59Z"
                );
                let top = limit.to_string();
                let body = client
                    .get(base_url)
                    .query(&[
                        ("$filter", filter.as_str()),
                        ("$orderby", "PublicationDate desc"),
                        ("$top", top.as_str()),
                        ("$select", SELECT_FIELDS),
                    ])
                    .header("User-Agent", USER_AGENT)
                    .send()
                    .await
                    .context("who backfill get()")?
                    .error_for_status()
                    .context("who backfill status")?
                    .text()
                    .await
                    .context("who backfill .text()")?;
                parse_don_page(&body)
            }
        }
    }
}

#[async_trait]
impl ReportSource for WhoDonSource {
    async fn fetch_latest(&self) -> Result<Vec<RawReport>> {
        match &self.mode {
            Mode::Fixture(json) => parse_don_page(json),
            Mode::Http { base_url, client } => {
                let top = LATEST_PAGE_SIZE.to_string();
                let body = match client
                    .get(base_url)
                    .query(&[
                        ("$orderby", "PublicationDate desc"),
                        ("$top", top.as_str()),
                        ("$select", SELECT_FIELDS),
                    ])
                    .header("User-Agent", USER_AGENT)
                    .send()
                    .await
                {
                    Ok(resp) => resp
                        .error_for_status()
                        .context("who status")?
                        .text()
                        .await
                        .context("who .text()")?,
                    Err(e) => {
                        tracing::warn!(error = ?e, provider = "WHO", "provider http error");
                        counter!("source_errors_total").increment(1);
                        return Err(e).context("who get()");
                    }
                };
                parse_don_page(&body)
            }
        }
    }

    fn name(&self) -> &'static str {
        "WHO"
    }
}

fn parse_don_page(json: &str) -> Result<Vec<RawReport>> {
    let t0 = std::time::Instant::now();
    let page: DonPage = serde_json::from_str(json).context("parsing who don json")?;
    let total = page.value.len();

    let mut out = Vec::with_capacity(total);
    for item in page.value {
        let disease = extract_disease(&item.title);
        let country = extract_country(&item.title);
        let summary_raw = item.summary.as_deref().unwrap_or_default();
        let summary = normalize_summary(summary_raw);
        let severity = estimate_severity(&item.title, &summary);

        // Global updates carry no mappable country; drop them here.
        if country == GLOBAL_COUNTRY || country == "Global update" {
            continue;
        }

        out.push(RawReport {
            disease_name: disease.to_string(),
            country,
            region: None,
            title: item.title,
            summary: truncate_chars(&summary, SUMMARY_MAX_CHARS),
            url: item
                .url_name
                .map(|u| format!("https://www.who.int/emergencies/disease-outbreak-news/item/{u}")),
            source_type: SourceType::Who,
            source_name: "WHO".to_string(),
            published_at: item
                .publication_date
                .as_deref()
                .map(parse_publication_date)
                .unwrap_or(DateTime::UNIX_EPOCH),
            severity_hint: Some(severity),
            case_count: None,
        });
    }

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("pipeline_parse_ms").record(ms);
    tracing::info!(parsed = out.len(), items = total, "WHO: parsed outbreak reports");
    Ok(out)
}

fn parse_publication_date(ts: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(ts)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publication_date_falls_back_to_epoch() {
        assert_eq!(parse_publication_date("not a date"), DateTime::UNIX_EPOCH);
        let dt = parse_publication_date("2025-03-14T00:00:00Z");
        assert_eq!(dt.to_rfc3339(), "2025-03-14T00:00:00+00:00");
    }

    #[test]
    fn global_bulletins_are_dropped() {
        let json = r#"{"value":[
            {"DonId":"1","Title":"Mpox - Global","PublicationDate":"2025-01-01T00:00:00Z","Summary":"s","UrlName":"a"},
            {"DonId":"2","Title":"Cholera - Sudan","PublicationDate":"2025-01-02T00:00:00Z","Summary":"Risk is high","UrlName":"b"}
        ]}"#;
        let out = parse_don_page(json).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].disease_name, "Cholera");
        assert_eq!(out[0].country, "Sudan");
    }
}
