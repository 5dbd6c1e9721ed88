// src/ingest/mod.rs
pub mod providers;
pub mod types;

use crate::ingest::types::{RawReport, ReportSource};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

/// Maximum characters of bulletin summary carried into storage.
pub const SUMMARY_MAX_CHARS: usize = 500;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "pipeline_reports_fetched_total",
            "Reports produced by source providers."
        );
        describe_counter!("pipeline_new_outbreaks_total", "Outbreak rows created.");
        describe_counter!("pipeline_new_locations_total", "Location rows created.");
        describe_counter!("pipeline_new_reports_total", "Report rows created.");
        describe_counter!(
            "pipeline_duplicates_total",
            "Reports skipped as duplicates or unclassifiable."
        );
        describe_counter!(
            "pipeline_store_errors_total",
            "Per-report storage write failures (batch continues)."
        );
        describe_counter!("geocode_misses_total", "Lookups that produced no coordinates.");
        describe_counter!("source_errors_total", "Provider fetch/parse errors.");
        describe_histogram!("pipeline_parse_ms", "Source page parse time in milliseconds.");
        describe_histogram!("pipeline_run_ms", "End-to-end pipeline run time in milliseconds.");
        describe_gauge!("pipeline_last_run_ts", "Unix ts when the pipeline last ran.");
    });
}

/// Clean a WHO/ReliefWeb summary fragment: decode HTML entities, strip tags,
/// collapse whitespace. Truncation to [`SUMMARY_MAX_CHARS`] happens separately
/// so the stored-length contract stays a plain character cut.
pub fn normalize_summary(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();

    out.trim().to_string()
}

/// Character-based cap, not word-boundary-aware. Stored summaries and report
/// content must match this cut exactly.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        s.chars().take(max).collect()
    } else {
        s.to_string()
    }
}

/// Per-source fetch count for run summaries.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SourceTally {
    pub name: &'static str,
    pub fetched: usize,
}

/// Fetch from every configured source, concatenating results in provider
/// order. A failing source contributes zero reports; it never blocks the
/// others.
pub async fn fetch_all(sources: &[std::sync::Arc<dyn ReportSource>]) -> (Vec<RawReport>, Vec<SourceTally>) {
    ensure_metrics_described();

    let mut all = Vec::new();
    let mut tallies = Vec::with_capacity(sources.len());
    for src in sources {
        match src.fetch_latest().await {
            Ok(mut v) => {
                tracing::info!(source = src.name(), reports = v.len(), "source fetched");
                tallies.push(SourceTally {
                    name: src.name(),
                    fetched: v.len(),
                });
                all.append(&mut v);
            }
            Err(e) => {
                tracing::warn!(error = ?e, source = src.name(), "source error");
                counter!("source_errors_total").increment(1);
                tallies.push(SourceTally {
                    name: src.name(),
                    fetched: 0,
                });
            }
        }
    }

    counter!("pipeline_reports_fetched_total").increment(all.len() as u64);
    (all, tallies)
}
