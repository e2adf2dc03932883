//! HTTP API tests, driven through the router with `oneshot`.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use common::*;
use serde_json::Value;
use tower::ServiceExt;

use gazettewatch::api::{self, state::AppState};
use gazettewatch::scheduler::{TriggerScheduler, TriggerSlot};

fn app(source: StaticSource, notifier: Arc<RecordingNotifier>) -> Router {
    let (_scheduler, schedule) = TriggerScheduler::new(
        vec![TriggerSlot::new(7, 30).unwrap(), TriggerSlot::new(17, 0).unwrap()],
        Arc::new(merida_morning()),
        Duration::from_secs(60),
    )
    .unwrap();
    let pipeline = Arc::new(pipeline(source, notifier, true));
    api::router(AppState { pipeline, schedule })
}

async fn call(app: Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_health() {
    let app = app(published_source(), Arc::new(RecordingNotifier::default()));
    let (status, body) = call(app, "GET", "/api/v1/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["meta"]["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_root_lists_endpoints() {
    let app = app(published_source(), Arc::new(RecordingNotifier::default()));
    let (status, body) = call(app, "GET", "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["service"], "gazettewatch");
    assert_eq!(body["data"]["endpoints"]["run_report"], "/api/v1/run-report");
}

#[tokio::test]
async fn test_status_shows_schedule() {
    let app = app(published_source(), Arc::new(RecordingNotifier::default()));
    let (status, body) = call(app, "GET", "/api/v1/status").await;

    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["status"], "running");
    assert_eq!(data["timezone"], "America/Merida");
    assert_eq!(data["search_text"], PHRASE);
    assert!(data["current_time"].as_str().unwrap().starts_with("2026-10-19T07:30:00"));
    assert!(data["last_run"].is_null());

    let slots = data["schedules"].as_array().unwrap();
    assert_eq!(slots.len(), 2);
    assert_eq!(slots[0]["label"], "07:30");
    assert_eq!(slots[1]["label"], "17:00");
}

#[tokio::test]
async fn test_run_report_success() {
    let notifier = Arc::new(RecordingNotifier::default());
    let app = app(published_source(), Arc::clone(&notifier));
    let (status, body) = call(app, "POST", "/api/v1/run-report").await;

    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["status"], "success");
    assert_eq!(data["report_status"], "found");
    assert_eq!(data["pdf_sent"], true);
    assert_eq!(data["found_pages"], serde_json::json!([4]));
    assert!(data["result"].as_str().unwrap().starts_with("✅"));
    assert_eq!(notifier.sent().len(), 2);
}

#[tokio::test]
async fn test_run_report_partial_success_when_document_rejected() {
    let notifier = Arc::new(RecordingNotifier::failing_documents());
    let app = app(published_source(), notifier);
    let (status, body) = call(app, "POST", "/api/v1/run-report").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "partial_success");
    assert_eq!(body["data"]["pdf_sent"], false);
    assert_eq!(body["data"]["document"]["state"], "failed");
}

#[tokio::test]
async fn test_send_pdf_without_document_is_bad_gateway() {
    let source = StaticSource::default().with(PAGE_URL, Ok(Bytes::from(gazette_page(false))));
    let app = app(source, Arc::new(RecordingNotifier::default()));
    let (status, body) = call(app, "POST", "/api/v1/send-pdf").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["data"]["status"], "error");
}

#[tokio::test]
async fn test_send_pdf_success() {
    let notifier = Arc::new(RecordingNotifier::default());
    let app = app(published_source(), Arc::clone(&notifier));
    let (status, body) = call(app, "POST", "/api/v1/send-pdf").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["filename"], "2026-10-19.pdf");
    assert_eq!(body["data"]["text_found"], true);
    assert_eq!(notifier.sent().len(), 1);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = app(published_source(), Arc::new(RecordingNotifier::default()));
    let (status, _) = call(app, "GET", "/api/v1/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_run_report_requires_post() {
    let app = app(published_source(), Arc::new(RecordingNotifier::default()));
    let (status, _) = call(app, "GET", "/api/v1/run-report").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}
