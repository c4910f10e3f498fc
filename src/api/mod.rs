//! REST API server module
//!
//! Provides a small HTTP surface for submitting jobs, inspecting the worker and
//! following lifecycle events as server-sent events.

use crate::{Config, FetchService, Result};
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod error_response;
pub mod routes;
pub mod state;

pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Jobs
/// - `POST /jobs` - Submit a job
/// - `GET /status` - Worker state and queue counters
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /events` - Server-sent events stream
pub fn create_router(service: Arc<FetchService>, config: Arc<Config>) -> Router {
    let router = Router::new()
        .route("/jobs", post(routes::submit_job))
        .route("/status", get(routes::get_status))
        .route("/health", get(routes::health_check))
        .route("/events", get(routes::event_stream))
        .with_state(AppState::new(service))
        .layer(TraceLayer::new_for_http());

    if config.api.cors_enabled {
        router.layer(build_cors_layer(&config.api.cors_origins))
    } else {
        router
    }
}

/// CORS for the configured origins; `"*"` or no origins at all means any origin
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() || origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins.iter().filter_map(|origin| {
            match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(%origin, "Ignoring invalid CORS origin");
                    None
                }
            }
        }))
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

/// Start the API server on the configured bind address.
///
/// Runs until the server stops, either due to an error or because the task is aborted.
///
/// # Example
///
/// ```no_run
/// use fetch_queue::{Config, FetchService};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let service = Arc::new(FetchService::new((*config).clone())?);
///
/// // Start API server (blocks until shutdown)
/// fetch_queue::api::start_api_server(service, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(service: Arc<FetchService>, config: Arc<Config>) -> Result<()> {
    let bind_address = config.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let app = create_router(service, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
