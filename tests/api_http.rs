// tests/api_http.rs
//
// HTTP-level tests for the trigger routes without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - GET /pipeline/run  (happy path, re-run dedup, bearer auth)
// - POST /pipeline/backfill  (validation + happy path)

use std::fs;
use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value as Json};
use tower::ServiceExt as _; // for `oneshot`

use pulsemap::api::{create_router, AppState};
use pulsemap::geocode::CountryGeocoder;
use pulsemap::ingest::providers::reliefweb::ReliefWebSource;
use pulsemap::ingest::providers::who::WhoDonSource;
use pulsemap::ingest::types::ReportSource;
use pulsemap::store::memory::MemoryStore;

const BODY_LIMIT: usize = 1024 * 1024;

/// Router wired like the binary, but on fixtures and the in-memory store.
fn test_state(cron_secret: Option<&str>) -> AppState {
    let fixture =
        fs::read_to_string("tests/fixtures/who_don.json").expect("missing who_don.json fixture");
    let who = Arc::new(WhoDonSource::from_fixture_str(&fixture));
    let sources: Vec<Arc<dyn ReportSource>> =
        vec![who.clone(), Arc::new(ReliefWebSource::new(None))];

    AppState {
        store: Arc::new(MemoryStore::new()),
        // No token: gazetteer-only, so no network is touched in tests.
        geocoder: Arc::new(CountryGeocoder::new(None)),
        who,
        sources: Arc::new(sources),
        cron_secret: cron_secret.map(str::to_string),
    }
}

fn test_router(cron_secret: Option<&str>) -> Router {
    create_router(test_state(cron_secret))
}

async fn json_body(resp: axum::response::Response) -> Json {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    serde_json::from_slice(&bytes).expect("parse json body")
}

#[tokio::test]
async fn health_returns_200() {
    let app = test_router(None);
    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");

    let resp = app.oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn run_ingests_fixture_and_dedups_on_rerun() {
    let app = test_router(None);

    let run = || {
        Request::builder()
            .method("GET")
            .uri("/pipeline/run")
            .body(Body::empty())
            .expect("build GET /pipeline/run")
    };

    let resp = app.clone().oneshot(run()).await.expect("oneshot run");
    assert_eq!(resp.status(), StatusCode::OK);
    let v = json_body(resp).await;

    assert_eq!(v["success"], json!(true));
    // 5 fixture items, Global dropped in the provider.
    assert_eq!(v["sources"]["who"], json!(4));
    assert_eq!(v["sources"]["reliefweb"], json!(0));
    // Cholera/Sudan, MERS-CoV/Saudi Arabia, Dengue/Peru create outbreaks;
    // the unclassifiable influenza digest is skipped.
    assert_eq!(v["results"]["new_outbreaks"], json!(3));
    assert_eq!(v["results"]["new_locations"], json!(3));
    assert_eq!(v["results"]["new_reports"], json!(3));
    assert_eq!(v["results"]["skipped_duplicates"], json!(1));

    // Second run against the same state: everything dedups.
    let resp = app.oneshot(run()).await.expect("oneshot rerun");
    let v = json_body(resp).await;
    assert_eq!(v["results"]["new_outbreaks"], json!(0));
    assert_eq!(v["results"]["new_reports"], json!(0));
    assert_eq!(v["results"]["skipped_duplicates"], json!(4));
}

#[tokio::test]
async fn run_requires_bearer_secret_when_configured() {
    let app = test_router(Some("s3cret"));

    let no_auth = Request::builder()
        .method("GET")
        .uri("/pipeline/run")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(no_auth).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let wrong = Request::builder()
        .method("GET")
        .uri("/pipeline/run")
        .header("authorization", "Bearer nope")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(wrong).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let ok = Request::builder()
        .method("GET")
        .uri("/pipeline/run")
        .header("authorization", "Bearer s3cret")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(ok).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

fn backfill_req(body: Json) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/pipeline/backfill")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("build POST /pipeline/backfill")
}

#[tokio::test]
async fn backfill_validates_dates_and_source() {
    let app = test_router(None);

    let resp = app
        .clone()
        .oneshot(backfill_req(json!({"start_date": "12/06/2025", "end_date": "2025-06-30"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .clone()
        .oneshot(backfill_req(json!({"start_date": "2025-06-30", "end_date": "2025-06-01"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .oneshot(backfill_req(
            json!({"start_date": "2025-06-01", "end_date": "2025-06-30", "source": "cdc"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn backfill_processes_the_requested_range() {
    let app = test_router(None);

    let resp = app
        .oneshot(backfill_req(json!({
            "start_date": "2025-06-01",
            "end_date": "2025-06-30",
            "limit": 9999
        })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let v = json_body(resp).await;
    assert_eq!(v["success"], json!(true));
    assert_eq!(v["fetched"], json!(4));
    // Abusive limits are clamped, not rejected.
    assert_eq!(v["query"]["limit"], json!(500));
    assert_eq!(v["results"]["new_outbreaks"], json!(3));
}
