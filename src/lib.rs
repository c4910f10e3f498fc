//! # fetch-queue
//!
//! Single-flight background job queue with progress monitoring and event fan-out.
//!
//! Jobs are submitted from any thread and executed strictly one at a time by a
//! worker that starts on demand and stops once the queue is drained. While a job
//! runs, a progress monitor samples the fetch engine and publishes progress events;
//! every job ends with exactly one `Completed` or `Failed` event.
//!
//! ## Design Philosophy
//!
//! - **Library-first** - No CLI or UI, embed [`FetchService`] and subscribe to events
//! - **Pluggable fetch engine** - Anything implementing [`ProgressSource`] can be driven;
//!   [`CommandSource`](source::CommandSource) runs an external fetcher program
//! - **Event-driven** - Consumers subscribe to events, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use fetch_queue::{Config, Event, FetchService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = FetchService::new(Config::default())?;
//!
//!     let mut events = service.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             if let Event::Failed { id, reason } = &event {
//!                 eprintln!("job {id} failed: {reason}");
//!             }
//!         }
//!     });
//!
//!     service.submit("https://example.com/p/ABC123/")?;
//!     service.submit("alice")?;
//!     service.wait_idle().await;
//!
//!     service.shutdown().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Input classification
pub mod classify;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Status indicator subscriber
pub mod indicator;
/// Job queue, worker and progress monitor
pub mod service;
/// Fetch engines
pub mod source;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use classify::classify;
pub use config::{ApiConfig, ClassifyConfig, Config, SourceConfig};
pub use error::{Error, FetchError, Result};
pub use indicator::{IndicatorState, StatusIndicator};
pub use service::{EventBus, EventSubscriber, FetchService, JobQueue};
pub use source::ProgressSource;
pub use types::{
    Event, FetchTarget, Job, JobId, MonitorState, ProgressSnapshot, ProgressUpdate, QueueStats,
    WorkerState,
};

/// Run the service until a termination signal arrives, then shut it down
///
/// Waits for SIGTERM or SIGINT on Unix and Ctrl+C elsewhere, then calls
/// [`FetchService::shutdown`], which interrupts the running job and drops pending ones.
///
/// # Example
///
/// ```no_run
/// use fetch_queue::{Config, FetchService, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let service = FetchService::new(Config::default())?;
///     service.spawn_api_server();
///
///     run_with_shutdown(service).await?;
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(service: FetchService) -> Result<()> {
    wait_for_signal().await;
    service.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration can fail in restricted environments (containers, tests)
    match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM signal"),
                _ = sigint.recv() => tracing::info!("Received SIGINT signal (Ctrl+C)"),
            }
        }
        (sigterm, sigint) => {
            if let Err(e) = sigterm.as_ref().and(sigint.as_ref()) {
                tracing::warn!(error = %e, "Could not register signal handlers, using ctrl_c fallback");
            }
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C signal"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C signal"),
    }
}
