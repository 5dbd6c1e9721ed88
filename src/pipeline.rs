// src/pipeline.rs
//! # Dedup/Merge Engine
//! Takes a batch of classified reports and the current persisted state and
//! decides, per report, whether it is a pure duplicate, a brand-new outbreak,
//! a severity escalation, and/or a new location — then applies the writes.
//!
//! Reports are processed strictly in input order: later reports see outbreaks
//! and titles created earlier in the same batch (read-your-own-writes within
//! the run). Per-report failures never abort the batch; only the initial
//! state load is allowed to fail the whole call.

use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use chrono::Utc;
use metrics::counter;
use serde::Serialize;
use uuid::Uuid;

use crate::classify::{UNKNOWN_COUNTRY, UNKNOWN_DISEASE};
use crate::geocode::Geocode;
use crate::ingest::types::{RawReport, Severity};
use crate::ingest::{truncate_chars, SUMMARY_MAX_CHARS};
use crate::store::{NewLocation, NewOutbreak, NewReport, OutbreakStore};

/// Result of one merge pass. All counts, all non-negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub new_outbreaks: u64,
    pub new_locations: u64,
    pub new_reports: u64,
    pub skipped_duplicates: u64,
}

/// Global dedup key for reports: title, case-insensitive, trimmed.
pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Merge a batch of reports into the store. See module docs for semantics.
///
/// Fails only if the initial state load fails — without a consistent view of
/// existing titles and outbreaks, deduplication cannot be guaranteed.
pub async fn process_reports(
    store: &dyn OutbreakStore,
    geocoder: &dyn Geocode,
    reports: &[RawReport],
) -> Result<RunSummary> {
    let mut summary = RunSummary::default();
    if reports.is_empty() {
        return Ok(summary);
    }

    // One consistent snapshot per call; mutated locally as the batch writes.
    let mut seen_titles: HashSet<String> = store
        .list_report_titles()
        .await
        .context("loading existing report titles")?
        .iter()
        .map(|t| normalize_title(t))
        .collect();

    // disease_name -> (outbreak id, recorded severity); first-seen-wins when
    // storage holds duplicates for one disease.
    let mut outbreaks: HashMap<String, (Uuid, Severity)> = HashMap::new();
    for row in store
        .list_outbreaks()
        .await
        .context("loading existing outbreaks")?
    {
        outbreaks
            .entry(row.disease_name)
            .or_insert((row.id, row.severity));
    }

    for report in reports {
        let title_key = normalize_title(&report.title);
        if seen_titles.contains(&title_key) {
            summary.skipped_duplicates += 1;
            continue;
        }
        if report.disease_name == UNKNOWN_DISEASE || report.country == UNKNOWN_COUNTRY {
            summary.skipped_duplicates += 1;
            continue;
        }

        // Find or create the owning outbreak.
        let outbreak_id = match outbreaks.get(&report.disease_name).copied() {
            Some((id, recorded)) => {
                // Escalate, never de-escalate. The map tracks the escalated
                // value so monotonicity holds for the rest of the batch.
                if let Some(hint) = report.severity_hint {
                    if hint.rank() > recorded.rank() {
                        match store.update_outbreak_severity(id, hint, Utc::now()).await {
                            Ok(()) => {
                                outbreaks.insert(report.disease_name.clone(), (id, hint));
                            }
                            Err(e) => {
                                tracing::warn!(error = ?e, disease = %report.disease_name,
                                    "severity update failed");
                                counter!("pipeline_store_errors_total").increment(1);
                            }
                        }
                    }
                }
                id
            }
            None => {
                let severity = report.severity_hint.unwrap_or(Severity::Moderate);
                let created = store
                    .create_outbreak(NewOutbreak {
                        disease_name: report.disease_name.clone(),
                        status: "active".to_string(),
                        severity,
                        first_reported: report.published_at,
                        summary: truncate_chars(&report.summary, SUMMARY_MAX_CHARS),
                    })
                    .await;
                match created {
                    Ok(id) => {
                        outbreaks.insert(report.disease_name.clone(), (id, severity));
                        summary.new_outbreaks += 1;
                        id
                    }
                    Err(e) => {
                        tracing::warn!(error = ?e, disease = %report.disease_name,
                            "outbreak create failed; skipping report");
                        counter!("pipeline_store_errors_total").increment(1);
                        continue;
                    }
                }
            }
        };

        // Geocode and record the location, once per (outbreak, country).
        // A miss is normal: skip silently and move on to the report insert.
        if let Some(coords) = geocoder.geocode(&report.country, report.region.as_deref()).await {
            match store.find_location(outbreak_id, &report.country).await {
                Ok(Some(_)) => {}
                Ok(None) => {
                    let insert = store
                        .create_location(NewLocation {
                            outbreak_id,
                            latitude: coords.latitude,
                            longitude: coords.longitude,
                            country: report.country.clone(),
                            region: report.region.clone(),
                            case_count: report.case_count.unwrap_or(0),
                            severity_score: report
                                .severity_hint
                                .unwrap_or(Severity::Moderate)
                                .score(),
                        })
                        .await;
                    match insert {
                        Ok(()) => summary.new_locations += 1,
                        Err(e) => {
                            tracing::warn!(error = ?e, country = %report.country,
                                "location insert failed");
                            counter!("pipeline_store_errors_total").increment(1);
                        }
                    }
                }
                Err(e) => {
                    // Can't prove the location doesn't exist; inserting blind
                    // could break the one-row-per-country invariant.
                    tracing::warn!(error = ?e, country = %report.country,
                        "location lookup failed; skipping location");
                    counter!("pipeline_store_errors_total").increment(1);
                }
            }
        }

        let inserted = store
            .create_report(NewReport {
                outbreak_id,
                source_type: report.source_type,
                source_name: report.source_name.clone(),
                title: report.title.clone(),
                url: report.url.clone(),
                content: truncate_chars(&report.summary, SUMMARY_MAX_CHARS),
                published_at: report.published_at,
            })
            .await;
        match inserted {
            Ok(()) => {
                summary.new_reports += 1;
                // Later reports in this batch dedup against this title too.
                seen_titles.insert(title_key);
            }
            Err(e) => {
                tracing::warn!(error = ?e, title = %report.title, "report insert failed");
                counter!("pipeline_store_errors_total").increment(1);
            }
        }
    }

    counter!("pipeline_new_outbreaks_total").increment(summary.new_outbreaks);
    counter!("pipeline_new_locations_total").increment(summary.new_locations);
    counter!("pipeline_new_reports_total").increment(summary.new_reports);
    counter!("pipeline_duplicates_total").increment(summary.skipped_duplicates);

    Ok(summary)
}
