//! Route handlers for the REST API
//!
//! - [`jobs`] - Job submission and worker status
//! - [`system`] - Health and events

use crate::types::{Job, JobId, MonitorState, QueueStats};
use serde::{Deserialize, Serialize};

mod jobs;
mod system;

pub use jobs::*;
pub use system::*;

/// Request body for POST /jobs
#[derive(Debug, Deserialize, Serialize)]
pub struct SubmitJobRequest {
    /// Content-source identifier: a username or a link to a single item
    pub input: String,
}

/// Response for POST /jobs
#[derive(Debug, Deserialize, Serialize)]
pub struct SubmitJobResponse {
    /// ID assigned to the queued job
    pub id: JobId,
}

/// Response for GET /status
#[derive(Debug, Deserialize, Serialize)]
pub struct StatusResponse {
    /// Queue and worker counters
    #[serde(flatten)]
    pub stats: QueueStats,
    /// Job currently executing, if any
    pub current_job: Option<Job>,
    /// Whether the current job's progress monitor is polling
    pub monitor: MonitorState,
    /// Whether new jobs are accepted
    pub accepting: bool,
}
