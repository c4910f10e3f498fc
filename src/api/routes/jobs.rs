//! Job submission and status handlers.

use super::{StatusResponse, SubmitJobRequest, SubmitJobResponse};
use crate::api::AppState;
use crate::error::Error;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// POST /jobs - Submit a job
///
/// Blank input is rejected here, the service itself accepts anything.
pub async fn submit_job(
    State(state): State<AppState>,
    Json(request): Json<SubmitJobRequest>,
) -> Response {
    let input = request.input.trim();
    if input.is_empty() {
        return Error::InvalidInput("input must not be blank".to_string()).into_response();
    }

    match state.service.submit(input) {
        Ok(id) => (StatusCode::ACCEPTED, Json(SubmitJobResponse { id })).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Rejected job submission");
            e.into_response()
        }
    }
}

/// GET /status - Worker state and queue counters
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    let service = &state.service;
    Json(StatusResponse {
        stats: service.queue_stats(),
        current_job: service.current_job(),
        monitor: service.monitor_state(),
        accepting: service.is_accepting(),
    })
}
