// tests/providers_who.rs
use std::fs;

use pulsemap::ingest::types::{ReportSource, Severity, SourceType};
use pulsemap::ingest::providers::who::WhoDonSource;

fn fixture() -> String {
    fs::read_to_string("tests/fixtures/who_don.json").expect("missing tests/fixtures/who_don.json")
}

#[tokio::test]
async fn who_fixture_parses_and_classifies() {
    let provider = WhoDonSource::from_fixture_str(&fixture());
    let reports = provider.fetch_latest().await.expect("who parse ok");

    // Five items in the fixture; the Global bulletin never leaves the provider.
    assert_eq!(reports.len(), 4);
    assert!(reports.iter().all(|r| r.source_type == SourceType::Who));
    assert!(reports.iter().all(|r| r.country != "Global"));

    let cholera = &reports[0];
    assert_eq!(cholera.disease_name, "Cholera");
    assert_eq!(cholera.country, "Sudan");
    assert_eq!(cholera.severity_hint, Some(Severity::Critical));
    assert_eq!(
        cholera.url.as_deref(),
        Some("https://www.who.int/emergencies/disease-outbreak-news/item/2025-DON001")
    );
    assert_eq!(cholera.published_at.to_rfc3339(), "2025-06-12T00:00:00+00:00");

    let mers = &reports[1];
    assert_eq!(mers.disease_name, "MERS-CoV");
    assert_eq!(mers.country, "Saudi Arabia");
    assert_eq!(mers.severity_hint, Some(Severity::Moderate));

    let dengue = &reports[3];
    assert_eq!(dengue.disease_name, "Dengue");
    // "(update)" qualifier is stripped from the country.
    assert_eq!(dengue.country, "Peru");
    assert_eq!(dengue.severity_hint, Some(Severity::Severe));
}

#[tokio::test]
async fn who_summaries_are_normalized_html() {
    let provider = WhoDonSource::from_fixture_str(&fixture());
    let reports = provider.fetch_latest().await.expect("who parse ok");

    for r in &reports {
        assert!(!r.summary.contains('<'), "summary still has markup: {}", r.summary);
        assert!(r.summary.chars().count() <= 500);
    }
    assert!(reports[0].summary.starts_with("The risk is high"));
}

#[tokio::test]
async fn who_date_range_on_fixture_parses_the_page() {
    let provider = WhoDonSource::from_fixture_str(&fixture());
    let start = chrono::NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
    let end = chrono::NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
    let reports = provider.fetch_range(start, end, 200).await.expect("range ok");
    assert_eq!(reports.len(), 4);
}
