// HTTP route handlers for the grader API

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json, Response,
    },
};
use futures_util::stream::{self, Stream};
use grader_common::types::GradeRequest;
use grader_engine::verdict::Failure;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::events::{self, VerdictEvent};
use crate::metrics;
use crate::AppState;

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

/// POST /grade - Grade a submission and return its verdict
pub async fn grade(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GradeRequest>,
) -> Response {
    if payload.source_code.trim().is_empty() {
        return bad_request("source_code must not be empty");
    }
    if payload.test_cases.is_empty() {
        return bad_request("test_cases must not be empty");
    }
    if payload.timeout_ms == Some(0) {
        return bad_request("timeout_ms must be greater than zero");
    }

    let id = Uuid::new_v4();
    info!(
        id = %id,
        source_size = payload.source_code.len(),
        test_cases = payload.test_cases.len(),
        "Submission received"
    );

    match state.grader.grade_request(&payload).await {
        Ok(verdict) => {
            metrics::record(&verdict);
            events::publish(&state.events, VerdictEvent::from_verdict(id, &verdict));
            info!(id = %id, status = %verdict.status(), "Submission graded");
            (StatusCode::OK, Json(verdict)).into_response()
        }
        Err(e) => {
            // Infrastructure details stay in the log
            error!(id = %id, error = %e, "Grading failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": Failure::Internal.to_string() })),
            )
                .into_response()
        }
    }
}

/// GET /health - Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /metrics - Prometheus scrape endpoint
pub async fn metrics() -> Response {
    match metrics::render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// GET /events - Server-sent stream of verdict events
pub async fn events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let rx = state.events.subscribe();

    let stream = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let sse = Event::default().event("verdict").json_data(&event);
                    return Some((sse, rx));
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event subscriber lagged, skipping");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
