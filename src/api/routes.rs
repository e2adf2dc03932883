//! API route definitions.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::state::AppState;
use crate::notify::DocumentDelivery;
use crate::pipeline::ManualSendError;
use crate::scheduler::Trigger;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/run-report", post(run_report))
        .route("/send-pdf", post(send_pdf))
}

fn meta() -> Value {
    json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    })
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "data": {
            "service": "gazettewatch",
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "health": "/api/v1/health",
                "status": "/api/v1/status",
                "run_report": "/api/v1/run-report",
                "send_pdf": "/api/v1/send-pdf"
            }
        },
        "meta": meta()
    }))
}

async fn health() -> Json<Value> {
    Json(json!({
        "data": {
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION")
        },
        "meta": meta()
    }))
}

async fn status(State(state): State<AppState>) -> Json<Value> {
    let now = state.pipeline.clock().now();
    let schedule = state.schedule.schedule_state();

    Json(json!({
        "data": {
            "status": "running",
            "current_time": now.to_rfc3339(),
            "timezone": schedule.timezone,
            "search_text": state.pipeline.settings().search_text,
            "schedules": schedule.slots,
            "last_run": state.pipeline.last_run()
        },
        "meta": meta()
    }))
}

async fn run_report(State(state): State<AppState>) -> Json<Value> {
    info!("manual report requested");
    let (report, delivery) = state.pipeline.execute(Trigger::Manual).await;

    let (outcome, message) = match (&delivery.document, delivery.summary_sent) {
        (_, false) => ("error", "report built but the summary could not be sent"),
        (DocumentDelivery::Failed { .. }, true) => {
            ("partial_success", "report sent but the document could not be sent")
        }
        (DocumentDelivery::Sent, true) => ("success", "report and document sent"),
        (DocumentDelivery::NotAttempted, true) => ("success", "report sent"),
    };

    let search = report.search_result();
    Json(json!({
        "data": {
            "status": outcome,
            "message": message,
            "result": report.summary_text(),
            "report_status": report.status(),
            "page_title": report.page_title(),
            "found_pages": search.map(|r| r.found_pages.clone()),
            "pdf_filename": search.map(|r| r.filename.clone()),
            "pdf_sent": delivery.document_sent(),
            "document": delivery.document
        },
        "meta": meta()
    }))
}

async fn send_pdf(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    info!("manual document send requested");
    match state.pipeline.send_document_now().await {
        Ok(report) => {
            let search = report.search_result();
            (
                StatusCode::OK,
                Json(json!({
                    "data": {
                        "status": "success",
                        "message": "document sent",
                        "filename": search.map(|r| r.filename.clone()),
                        "text_found": search.map(|r| r.found()).unwrap_or(false),
                        "found_pages": search.map(|r| r.found_pages.clone()).unwrap_or_default()
                    },
                    "meta": meta()
                })),
            )
        }
        Err(e) => {
            warn!(error = %e, "manual document send failed");
            let message = match &e {
                ManualSendError::NoDocument(_) => "could not obtain the document from the gazette site",
                ManualSendError::Notify(_) => "could not send the document",
            };
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "data": {
                        "status": "error",
                        "message": message,
                        "detail": e.to_string()
                    },
                    "meta": meta()
                })),
            )
        }
    }
}
