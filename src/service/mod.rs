//! Background fetch service split into focused submodules.
//!
//! The `FetchService` struct and its methods are organized by concern:
//! - [`queue`] - FIFO of pending jobs
//! - [`events`] - Event fan-out to subscribers
//! - [`lifecycle`] - Submission, single-flight worker activation, idle exit and shutdown
//! - [`worker`] - Per-job execution
//! - [`monitor`] - Progress polling alongside the running fetch

mod events;
mod lifecycle;
mod monitor;
mod queue;
mod worker;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

pub use events::{EventBus, EventSubscriber};
pub use queue::JobQueue;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::source::{CommandSource, ProgressSource};
use crate::types::Job;
use lifecycle::ProcessingFlag;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64};

/// Worker coordination state shared by every clone of the service
#[derive(Clone)]
pub(crate) struct WorkerControl {
    /// Single-flight activation flag (Idle/Processing)
    pub(crate) flag: Arc<ProcessingFlag>,
    /// Job currently executing
    pub(crate) current: Arc<std::sync::Mutex<Option<Job>>>,
    /// Whether the progress monitor of the current job is polling
    pub(crate) monitor_running: Arc<AtomicBool>,
    /// Next job ID to hand out
    pub(crate) next_id: Arc<AtomicU64>,
    /// Flag to indicate whether new jobs are accepted (set to false during shutdown)
    pub(crate) accepting_new: Arc<AtomicBool>,
    /// Cancelled once on shutdown; every monitor token is a child of it
    pub(crate) shutdown: tokio_util::sync::CancellationToken,
    /// Tracks worker runs so shutdown can wait for them
    pub(crate) tasks: tokio_util::task::TaskTracker,
    /// Notified whenever a worker run exits
    pub(crate) idle: Arc<tokio::sync::Notify>,
    /// Jobs completed since start
    pub(crate) completed: Arc<AtomicU64>,
    /// Jobs failed since start
    pub(crate) failed: Arc<AtomicU64>,
}

impl WorkerControl {
    fn new() -> Self {
        Self {
            flag: Arc::new(ProcessingFlag::new()),
            current: Arc::new(std::sync::Mutex::new(None)),
            monitor_running: Arc::new(AtomicBool::new(false)),
            next_id: Arc::new(AtomicU64::new(1)),
            accepting_new: Arc::new(AtomicBool::new(true)),
            shutdown: tokio_util::sync::CancellationToken::new(),
            tasks: tokio_util::task::TaskTracker::new(),
            idle: Arc::new(tokio::sync::Notify::new()),
            completed: Arc::new(AtomicU64::new(0)),
            failed: Arc::new(AtomicU64::new(0)),
        }
    }
}

/// Main service instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct FetchService {
    /// Event fan-out to subscribers
    pub(crate) events: EventBus,
    /// Configuration
    pub(crate) config: Arc<Config>,
    /// Fetch engine driven by the worker
    pub(crate) source: Arc<dyn ProgressSource>,
    /// Pending jobs
    pub(crate) queue: JobQueue,
    /// Worker coordination state
    pub(crate) worker: WorkerControl,
    /// Runtime the worker and monitors are spawned on
    pub(crate) runtime: tokio::runtime::Handle,
}

impl FetchService {
    /// Create a service that fetches through the configured external program
    ///
    /// Must be called from within a tokio runtime; the runtime is captured so that
    /// [`submit`](Self::submit) can be called from any thread afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if no fetcher program can be located or no runtime is running.
    pub fn new(config: Config) -> Result<Self> {
        let source = CommandSource::from_config(&config.source)?;
        tracing::info!(
            source = source.name(),
            program = %source.binary_path().display(),
            "Fetch source initialized"
        );
        Self::with_source(config, Arc::new(source))
    }

    /// Create a service around an injected fetch engine
    ///
    /// # Errors
    ///
    /// Returns an error if called outside a tokio runtime.
    pub fn with_source(config: Config, source: Arc<dyn ProgressSource>) -> Result<Self> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            Error::NotSupported(format!("FetchService requires a tokio runtime: {}", e))
        })?;

        Ok(Self {
            events: EventBus::new(config.event_buffer),
            config: Arc::new(config),
            source,
            queue: JobQueue::new(),
            worker: WorkerControl::new(),
            runtime,
        })
    }

    /// Subscribe to lifecycle events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// A subscriber that falls behind by more than `event_buffer` events receives
    /// `RecvError::Lagged` and continues from the oldest retained event; use
    /// [`attach`](Self::attach) for lossless delivery.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use fetch_queue::{Config, FetchService};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let service = FetchService::new(Config::default())?;
    ///
    ///     let mut events = service.subscribe();
    ///     tokio::spawn(async move {
    ///         while let Ok(event) = events.recv().await {
    ///             println!("{:?}", event);
    ///         }
    ///     });
    ///
    ///     service.submit("alice")?;
    ///     Ok(())
    /// }
    /// ```
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<crate::types::Event> {
        self.events.subscribe()
    }

    /// Attach a subscriber that is fed every event on its own task
    ///
    /// A slow subscriber never delays the worker or other subscribers, and unlike a
    /// [`subscribe`](Self::subscribe) receiver it never misses an event.
    pub fn attach<S: EventSubscriber>(&self, subscriber: S) -> tokio::task::JoinHandle<()> {
        let inbox = self.events.register();
        self.runtime.spawn(events::run_subscriber(inbox, subscriber))
    }

    /// The event bus this service publishes on
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Spawn the REST API server in a background task
    ///
    /// Returns `None` when `api.enabled` is false.
    pub fn spawn_api_server(&self) -> Option<tokio::task::JoinHandle<Result<()>>> {
        if !self.config.api.enabled {
            tracing::debug!("API server disabled in configuration");
            return None;
        }

        let service = Arc::new(self.clone());
        let config = self.config.clone();
        Some(
            self.runtime
                .spawn(async move { crate::api::start_api_server(service, config).await }),
        )
    }
}
