//! Core types for fetch-queue

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status text shown while a job is connecting or reports a blank status
pub const STATUS_CONNECTING: &str = "Connecting";

/// Status text carried by a successful terminal update
pub const STATUS_COMPLETED: &str = "Completed";

/// Unique identifier for a submitted job
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl JobId {
    /// Get the inner u64 value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for JobId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One submitted unit of work. Immutable once created and consumed exactly once by the worker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Job identifier, assigned in submission order
    pub id: JobId,
    /// Raw content-source identifier as submitted
    pub input: String,
    /// When the job was submitted
    pub submitted_at: DateTime<Utc>,
}

impl Job {
    /// Create a job stamped with the current time
    pub fn new(id: JobId, input: impl Into<String>) -> Self {
        Self {
            id,
            input: input.into(),
            submitted_at: Utc::now(),
        }
    }
}

/// Which fetch path a job is dispatched to
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "identifier", rename_all = "snake_case")]
pub enum FetchTarget {
    /// A single item, addressed by its short identifier
    Single(String),
    /// A collection of items (e.g. everything a profile published)
    Collection(String),
}

impl FetchTarget {
    /// The identifier handed to the fetch engine
    pub fn identifier(&self) -> &str {
        match self {
            FetchTarget::Single(id) | FetchTarget::Collection(id) => id,
        }
    }

    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            FetchTarget::Single(_) => "single",
            FetchTarget::Collection(_) => "collection",
        }
    }
}

/// Point-in-time read of a job's progress
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Items done so far
    pub current: u64,
    /// Items expected in total (0 while unknown)
    pub total: u64,
    /// Human-readable status line
    pub status: String,
}

impl ProgressSnapshot {
    /// Create a snapshot
    pub fn new(current: u64, total: u64, status: impl Into<String>) -> Self {
        Self {
            current,
            total,
            status: status.into(),
        }
    }

    /// Whether the snapshot can drive a determinate progress indicator
    pub fn is_determinate(&self) -> bool {
        self.total > 0
    }
}

/// Event emitted during the job lifecycle
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Job accepted into the queue
    Queued {
        /// Job ID
        id: JobId,
        /// Submitted input
        input: String,
    },

    /// Job dequeued, fetch about to start
    Connecting {
        /// Job ID
        id: JobId,
    },

    /// Progress sample from the running job
    Progress {
        /// Job ID
        id: JobId,
        /// Items done so far
        current: u64,
        /// Items expected in total (always > 0)
        total: u64,
        /// Status line reported by the fetch engine
        status: String,
    },

    /// Job finished successfully
    Completed {
        /// Job ID
        id: JobId,
    },

    /// Job failed
    Failed {
        /// Job ID
        id: JobId,
        /// Human-readable reason
        reason: String,
    },

    /// Queue drained and the worker stopped
    Idle,

    /// Service is shutting down
    Shutdown,
}

impl Event {
    /// Job this event belongs to, if any
    pub fn job_id(&self) -> Option<JobId> {
        match self {
            Event::Queued { id, .. }
            | Event::Connecting { id }
            | Event::Progress { id, .. }
            | Event::Completed { id }
            | Event::Failed { id, .. } => Some(*id),
            Event::Idle | Event::Shutdown => None,
        }
    }

    /// Whether this is the last event a job will ever produce
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::Completed { .. } | Event::Failed { .. })
    }

    /// Stable snake_case name, used as the SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::Queued { .. } => "queued",
            Event::Connecting { .. } => "connecting",
            Event::Progress { .. } => "progress",
            Event::Completed { .. } => "completed",
            Event::Failed { .. } => "failed",
            Event::Idle => "idle",
            Event::Shutdown => "shutdown",
        }
    }

    /// Flatten into the notification payload used by UI observers.
    ///
    /// Returns `None` for events that carry no job progress.
    pub fn to_progress_update(&self) -> Option<ProgressUpdate> {
        match self {
            Event::Connecting { .. } => Some(ProgressUpdate {
                current: 0,
                total: 0,
                status: STATUS_CONNECTING.to_string(),
                done: false,
                failed: false,
            }),
            Event::Progress {
                current,
                total,
                status,
                ..
            } => Some(ProgressUpdate {
                current: *current,
                total: *total,
                status: status.clone(),
                done: false,
                failed: false,
            }),
            Event::Completed { .. } => Some(ProgressUpdate {
                current: 1,
                total: 1,
                status: STATUS_COMPLETED.to_string(),
                done: true,
                failed: false,
            }),
            Event::Failed { reason, .. } => Some(ProgressUpdate {
                current: 0,
                total: 1,
                status: reason.clone(),
                done: true,
                failed: true,
            }),
            Event::Queued { .. } | Event::Idle | Event::Shutdown => None,
        }
    }
}

/// Flat progress notification: determinate when `total > 0`, terminal when `done`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Items done so far
    pub current: u64,
    /// Items expected in total
    pub total: u64,
    /// Status or failure reason
    pub status: String,
    /// Whether the job reached a terminal state
    pub done: bool,
    /// Whether the terminal state is a failure
    pub failed: bool,
}

/// What the worker is doing right now
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "job", rename_all = "snake_case")]
pub enum WorkerState {
    /// No worker run is active
    Idle,
    /// A worker run is active; the job is present while it executes
    Processing(Option<Job>),
}

impl WorkerState {
    /// Whether a worker run is active
    pub fn is_processing(&self) -> bool {
        matches!(self, WorkerState::Processing(_))
    }
}

/// Lifecycle of the progress monitor attached to one job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorState {
    /// Not polling
    Stopped,
    /// Polling the progress source
    Running,
}

/// Snapshot of queue and worker counters
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Whether a worker run is active
    pub processing: bool,
    /// Job currently executing, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<JobId>,
    /// Jobs waiting in the queue
    pub pending: usize,
    /// Jobs that completed since start
    pub completed: u64,
    /// Jobs that failed since start
    pub failed: u64,
}
