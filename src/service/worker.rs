//! Per-job execution: classify, fetch, monitor, report.

use crate::classify::classify;
use crate::error::{Error, FetchError, Result};
use crate::source::ProgressSource;
use crate::types::{Event, FetchTarget, Job};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::Ordering;

use super::FetchService;
use super::monitor::{MonitorParams, spawn_progress_monitor};

impl FetchService {
    /// Execute one job to a terminal event
    ///
    /// Publishes `Connecting`, runs the fetch with a progress monitor beside it, and
    /// finishes with exactly one `Completed` or `Failed`. The monitor is stopped and
    /// joined before the terminal event, so no `Progress` for this job can follow it.
    /// Never returns an error: every failure becomes the job's `Failed` reason.
    pub(crate) async fn run_job(&self, job: Job) {
        let id = job.id;
        self.set_current(Some(job.clone()));
        self.events.publish(Event::Connecting { id });

        let target = classify(&job.input, &self.config.classify);
        tracing::info!(
            job_id = id.0,
            kind = target.kind(),
            identifier = target.identifier(),
            "Starting fetch"
        );

        let cancel_token = self.worker.shutdown.child_token();
        let mut monitor = spawn_progress_monitor(
            MonitorParams {
                id,
                source: self.source.clone(),
                events: self.events.clone(),
                interval: self.config.poll_interval,
                cancel_token: cancel_token.clone(),
                running: self.worker.monitor_running.clone(),
            },
            &self.runtime,
        );

        let fetch = AssertUnwindSafe(dispatch(self.source.as_ref(), &target)).catch_unwind();
        let mut monitor_finished = false;

        let result: Result<()> = tokio::select! {
            biased;
            _ = self.worker.shutdown.cancelled() => Err(FetchError::Interrupted.into()),
            outcome = fetch => match outcome {
                Ok(result) => result,
                Err(payload) => Err(FetchError::Panicked(panic_message(payload.as_ref())).into()),
            },
            joined = &mut monitor => {
                monitor_finished = true;
                let reason = match joined {
                    Err(e) => e.to_string(),
                    Ok(()) => "monitor exited".to_string(),
                };
                Err(FetchError::MonitorCrashed(reason).into())
            }
        };

        cancel_token.cancel();
        if !monitor_finished && let Err(e) = monitor.await {
            tracing::warn!(job_id = id.0, error = %e, "Progress monitor ended abnormally");
        }

        match result {
            Ok(()) => {
                tracing::info!(job_id = id.0, "Fetch completed");
                self.worker.completed.fetch_add(1, Ordering::SeqCst);
                self.events.publish(Event::Completed { id });
            }
            Err(e) => {
                tracing::warn!(job_id = id.0, error = %e, "Fetch failed");
                self.worker.failed.fetch_add(1, Ordering::SeqCst);
                self.events.publish(Event::Failed {
                    id,
                    reason: failure_reason(&e),
                });
            }
        }

        self.set_current(None);
    }

    fn set_current(&self, job: Option<Job>) {
        *self
            .worker
            .current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = job;
    }
}

/// Route a classified target to the matching fetch operation
async fn dispatch(source: &dyn ProgressSource, target: &FetchTarget) -> Result<()> {
    match target {
        FetchTarget::Single(identifier) => source.fetch_single(identifier).await,
        FetchTarget::Collection(identifier) => source.fetch_collection(identifier).await,
    }
}

/// Reason text carried by a `Failed` event
fn failure_reason(error: &Error) -> String {
    let reason = error.to_string();
    if reason.trim().is_empty() {
        "unknown error".to_string()
    } else {
        reason
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
