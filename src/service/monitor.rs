//! Progress polling alongside a running fetch.

use super::EventBus;
use crate::source::ProgressSource;
use crate::types::{Event, JobId};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Shortest accepted poll interval
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Parameters for the progress monitor task
pub(crate) struct MonitorParams {
    pub id: JobId,
    pub source: Arc<dyn ProgressSource>,
    pub events: EventBus,
    pub interval: Duration,
    pub cancel_token: CancellationToken,
    pub running: Arc<AtomicBool>,
}

/// Clears the running flag however the monitor task ends (cancel, return or panic)
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Spawn a task that samples the source every `interval` and publishes `Progress`
/// while the total is known.
///
/// Snapshot errors are logged and skipped. Once the token is cancelled the task
/// publishes nothing more; the caller awaits the returned handle before publishing
/// the job's terminal event.
pub(crate) fn spawn_progress_monitor(
    params: MonitorParams,
    runtime: &tokio::runtime::Handle,
) -> tokio::task::JoinHandle<()> {
    let MonitorParams {
        id,
        source,
        events,
        interval,
        cancel_token,
        running,
    } = params;

    running.store(true, Ordering::SeqCst);
    let guard = RunningGuard(running);

    runtime.spawn(async move {
        let _guard = guard;
        // First sample one period in, so a snapshot left over from the previous job is never read
        let period = interval.max(MIN_POLL_INTERVAL);
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = cancel_token.cancelled() => {
                    break;
                }
                _ = interval.tick() => {
                    let snapshot = match source.snapshot() {
                        Ok(snapshot) => snapshot,
                        Err(e) => {
                            tracing::debug!(job_id = id.0, error = %e, "Progress snapshot unavailable");
                            continue;
                        }
                    };

                    if !snapshot.is_determinate() || cancel_token.is_cancelled() {
                        continue;
                    }

                    events.publish(Event::Progress {
                        id,
                        current: snapshot.current,
                        total: snapshot.total,
                        status: snapshot.status,
                    });
                }
            }
        }

        tracing::trace!(job_id = id.0, "Progress monitor stopped");
    })
}
