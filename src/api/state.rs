//! State shared by the route handlers

use crate::FetchService;
use std::sync::Arc;
use std::time::Instant;

/// Handle to the service, cloned into every request
#[derive(Clone)]
pub struct AppState {
    /// Service that jobs are submitted to and status is read from
    pub service: Arc<FetchService>,
    /// When the router was built, reported as uptime by `/health`
    pub started_at: Instant,
}

impl AppState {
    /// Wrap a service, starting the uptime clock now
    pub fn new(service: Arc<FetchService>) -> Self {
        Self {
            service,
            started_at: Instant::now(),
        }
    }
}
