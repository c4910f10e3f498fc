//! Submission, single-flight worker activation, idle exit and shutdown.

use crate::error::{Error, Result};
use crate::types::{Event, Job, JobId, MonitorState, QueueStats, WorkerState};
use std::sync::atomic::{AtomicU8, Ordering};

use super::FetchService;

const IDLE: u8 = 0;
const PROCESSING: u8 = 1;

/// Two-state flag guaranteeing at most one active worker run
///
/// Only the caller that wins the Idle → Processing transition starts a worker;
/// every other concurrent activation attempt is a no-op.
#[derive(Debug)]
pub(crate) struct ProcessingFlag(AtomicU8);

impl ProcessingFlag {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(IDLE))
    }

    /// Atomically move Idle → Processing. Returns true for the single winner.
    pub(crate) fn try_activate(&self) -> bool {
        self.0
            .compare_exchange(IDLE, PROCESSING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Move back to Idle
    pub(crate) fn release(&self) {
        self.0.store(IDLE, Ordering::Release);
    }

    pub(crate) fn is_processing(&self) -> bool {
        self.0.load(Ordering::Acquire) == PROCESSING
    }
}

impl FetchService {
    /// Submit a job and start the worker if it is idle
    ///
    /// Never blocks and may be called from any thread. A `Queued` event is published
    /// before the job becomes visible to the worker, so a subscriber always sees
    /// `Queued` ahead of the job's `Connecting`. Callers are expected to filter blank
    /// input; whatever is submitted is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShuttingDown`] once [`shutdown`](Self::shutdown) has started.
    pub fn submit(&self, input: impl Into<String>) -> Result<JobId> {
        if !self.worker.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let id = JobId(self.worker.next_id.fetch_add(1, Ordering::SeqCst));
        let job = Job::new(id, input);
        tracing::info!(job_id = id.0, input = %job.input, "Job queued");

        self.events.publish(Event::Queued {
            id,
            input: job.input.clone(),
        });
        self.queue.enqueue(job);

        // Shutdown may have cleared the queue between the check above and the enqueue
        if !self.worker.accepting_new.load(Ordering::SeqCst) {
            self.queue.remove(id);
            tracing::debug!(job_id = id.0, "Job withdrawn, shutdown in progress");
            return Err(Error::ShuttingDown);
        }
        self.activate();

        Ok(id)
    }

    /// Start a worker run unless one is already active
    fn activate(&self) {
        if !self.worker.flag.try_activate() {
            return;
        }

        tracing::debug!("Worker activated");
        let service = self.clone();
        self.worker
            .tasks
            .spawn_on(async move { service.run_worker().await }, &self.runtime);
    }

    /// Drain the queue, then go idle
    async fn run_worker(&self) {
        loop {
            while !self.worker.shutdown.is_cancelled() {
                let Some(job) = self.queue.dequeue() else {
                    break;
                };
                self.run_job(job).await;
            }

            if self.worker.shutdown.is_cancelled() {
                self.worker.flag.release();
                break;
            }

            if !self.go_idle() {
                break;
            }
        }

        tracing::debug!("Worker stopped");
        self.worker.idle.notify_waiters();
    }

    /// Leave the processing state after the queue was seen empty
    ///
    /// Returns true if the worker must keep draining. `Idle` is only published while
    /// the flag is still held. A job enqueued after that is caught by the check
    /// following the release, since its submitter saw the flag set.
    fn go_idle(&self) -> bool {
        if !self.queue.is_empty() {
            return true;
        }

        self.events.publish(Event::Idle);
        self.worker.flag.release();

        if !self.queue.is_empty() && self.worker.flag.try_activate() {
            tracing::debug!("Job arrived during idle transition, continuing");
            return true;
        }
        false
    }

    /// Wait until the worker is idle with nothing queued
    ///
    /// Returns immediately if that is already the case.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.worker.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if !self.worker.flag.is_processing() && self.queue.is_empty() {
                return;
            }
            if self.worker.shutdown.is_cancelled() && !self.worker.flag.is_processing() {
                return;
            }
            notified.await;
        }
    }

    /// Gracefully shut down the service
    ///
    /// This method performs a graceful shutdown sequence:
    /// 1. Stops accepting new jobs
    /// 2. Interrupts the in-flight job, which is reported as `Failed`
    /// 3. Discards jobs still waiting in the queue
    /// 4. Waits for the worker to exit, bounded by `shutdown_timeout`
    /// 5. Publishes `Shutdown`
    ///
    /// Calling it more than once is harmless.
    ///
    /// # Errors
    ///
    /// Currently infallible; the `Result` leaves room for sources with cleanup to do.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        // 1. Stop accepting new jobs
        self.worker.accepting_new.store(false, Ordering::SeqCst);
        tracing::info!("Stopped accepting new jobs");

        // 2. Interrupt the worker (monitor tokens are children and stop with it)
        self.worker.shutdown.cancel();

        // 3. Drop queued jobs
        let discarded = self.queue.clear();
        if discarded > 0 {
            tracing::info!(discarded, "Discarded queued jobs");
        }

        // 4. Wait for the worker to finish with timeout
        self.worker.tasks.close();
        match tokio::time::timeout(self.config.shutdown_timeout, self.worker.tasks.wait()).await {
            Ok(()) => tracing::info!("Worker stopped gracefully"),
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.config.shutdown_timeout.as_millis() as u64,
                    "Timeout waiting for worker to stop, proceeding with shutdown"
                );
            }
        }

        // 5. Emit shutdown event
        self.events.publish(Event::Shutdown);
        tracing::info!("Shutdown complete");

        Ok(())
    }

    /// Whether `submit` is still accepted
    pub fn is_accepting(&self) -> bool {
        self.worker.accepting_new.load(Ordering::SeqCst)
    }

    /// What the worker is doing right now
    pub fn worker_state(&self) -> WorkerState {
        if self.worker.flag.is_processing() {
            WorkerState::Processing(self.current_job())
        } else {
            WorkerState::Idle
        }
    }

    /// Whether the current job's progress monitor is polling
    pub fn monitor_state(&self) -> MonitorState {
        if self.worker.monitor_running.load(Ordering::SeqCst) {
            MonitorState::Running
        } else {
            MonitorState::Stopped
        }
    }

    /// Job currently executing, if any
    pub fn current_job(&self) -> Option<Job> {
        self.worker
            .current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Number of jobs waiting in the queue
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Queue and worker counters
    pub fn queue_stats(&self) -> QueueStats {
        QueueStats {
            processing: self.worker.flag.is_processing(),
            current: self.current_job().map(|job| job.id),
            pending: self.queue.len(),
            completed: self.worker.completed.load(Ordering::SeqCst),
            failed: self.worker.failed.load(Ordering::SeqCst),
        }
    }
}
