//! Foreground status indicator driven by lifecycle events
//!
//! [`StatusIndicator`] is an [`EventSubscriber`] that folds the event stream into a
//! single [`IndicatorState`], published through a `tokio::sync::watch` channel so a
//! UI layer can render the latest state without seeing every intermediate event.

use crate::service::EventSubscriber;
use crate::types::{Event, STATUS_COMPLETED, STATUS_CONNECTING};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// What the status indicator should display
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum IndicatorState {
    /// A job was accepted but nothing is running yet
    Preparing,
    /// A job is running with no known total
    Indeterminate {
        /// Status line
        text: String,
    },
    /// A job is running with a known total
    Determinate {
        /// Items done so far
        current: u64,
        /// Items expected in total
        total: u64,
        /// Status line
        text: String,
    },
    /// The last job finished
    Finished {
        /// Whether it completed successfully
        success: bool,
        /// "Completed" or the failure reason
        text: String,
    },
    /// Nothing to show; the worker is idle
    Hidden,
}

/// Event subscriber that maintains the current [`IndicatorState`]
///
/// # Examples
///
/// ```no_run
/// use fetch_queue::{Config, FetchService, StatusIndicator};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let service = FetchService::new(Config::default())?;
/// let indicator = StatusIndicator::new();
/// let mut state = indicator.watch();
/// service.attach(indicator);
///
/// service.submit("alice")?;
/// while state.changed().await.is_ok() {
///     println!("{:?}", *state.borrow());
/// }
/// # Ok(())
/// # }
/// ```
pub struct StatusIndicator {
    state: watch::Sender<IndicatorState>,
}

impl StatusIndicator {
    /// Create an indicator in the `Preparing` state
    pub fn new() -> Self {
        let (state, _) = watch::channel(IndicatorState::Preparing);
        Self { state }
    }

    /// Receiver that observes every state change
    pub fn watch(&self) -> watch::Receiver<IndicatorState> {
        self.state.subscribe()
    }

    /// Current state
    pub fn state(&self) -> IndicatorState {
        self.state.borrow().clone()
    }

    /// Fold one event into the state
    pub fn apply(&self, event: &Event) {
        let current = self.state();
        if let Some(next) = next_state(&current, event) {
            self.state.send_replace(next);
        }
    }
}

impl Default for StatusIndicator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventSubscriber for StatusIndicator {
    async fn on_event(&mut self, event: &Event) {
        self.apply(event);
    }

    fn name(&self) -> &'static str {
        "status_indicator"
    }
}

fn next_state(current: &IndicatorState, event: &Event) -> Option<IndicatorState> {
    match event {
        Event::Queued { .. } => {
            matches!(current, IndicatorState::Hidden).then_some(IndicatorState::Preparing)
        }
        Event::Connecting { .. } => Some(IndicatorState::Indeterminate {
            text: STATUS_CONNECTING.to_string(),
        }),
        Event::Progress {
            current,
            total,
            status,
            ..
        } => {
            let text = if status.trim().is_empty() {
                STATUS_CONNECTING.to_string()
            } else {
                status.clone()
            };
            Some(if *total > 0 {
                IndicatorState::Determinate {
                    current: *current,
                    total: *total,
                    text,
                }
            } else {
                IndicatorState::Indeterminate { text }
            })
        }
        Event::Completed { .. } => Some(IndicatorState::Finished {
            success: true,
            text: STATUS_COMPLETED.to_string(),
        }),
        Event::Failed { reason, .. } => Some(IndicatorState::Finished {
            success: false,
            text: reason.clone(),
        }),
        Event::Idle | Event::Shutdown => Some(IndicatorState::Hidden),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::JobId;

    fn progress(current: u64, total: u64, status: &str) -> Event {
        Event::Progress {
            id: JobId(1),
            current,
            total,
            status: status.to_string(),
        }
    }

    #[test]
    fn follows_a_successful_job() {
        let indicator = StatusIndicator::new();
        assert_eq!(indicator.state(), IndicatorState::Preparing);

        indicator.apply(&Event::Connecting { id: JobId(1) });
        assert_eq!(
            indicator.state(),
            IndicatorState::Indeterminate {
                text: "Connecting".into()
            }
        );

        indicator.apply(&progress(2, 5, "Downloading post 2/5..."));
        assert_eq!(
            indicator.state(),
            IndicatorState::Determinate {
                current: 2,
                total: 5,
                text: "Downloading post 2/5...".into()
            }
        );

        indicator.apply(&Event::Completed { id: JobId(1) });
        assert_eq!(
            indicator.state(),
            IndicatorState::Finished {
                success: true,
                text: "Completed".into()
            }
        );

        indicator.apply(&Event::Idle);
        assert_eq!(indicator.state(), IndicatorState::Hidden);
    }

    #[test]
    fn blank_status_falls_back_to_connecting() {
        let indicator = StatusIndicator::new();
        indicator.apply(&progress(1, 3, "   "));
        assert_eq!(
            indicator.state(),
            IndicatorState::Determinate {
                current: 1,
                total: 3,
                text: "Connecting".into()
            }
        );
    }

    #[test]
    fn failure_shows_the_reason() {
        let indicator = StatusIndicator::new();
        indicator.apply(&Event::Failed {
            id: JobId(1),
            reason: "network unreachable".into(),
        });
        assert_eq!(
            indicator.state(),
            IndicatorState::Finished {
                success: false,
                text: "network unreachable".into()
            }
        );
    }

    #[test]
    fn queued_only_reappears_from_hidden() {
        let indicator = StatusIndicator::new();
        indicator.apply(&Event::Connecting { id: JobId(1) });
        indicator.apply(&Event::Queued {
            id: JobId(2),
            input: "bob".into(),
        });
        assert!(matches!(
            indicator.state(),
            IndicatorState::Indeterminate { .. }
        ));

        indicator.apply(&Event::Shutdown);
        indicator.apply(&Event::Queued {
            id: JobId(3),
            input: "carol".into(),
        });
        assert_eq!(indicator.state(), IndicatorState::Preparing);
    }

    #[tokio::test]
    async fn attached_indicator_tracks_the_bus() {
        let bus = crate::service::EventBus::new(16);
        let indicator = StatusIndicator::new();
        let mut state = indicator.watch();
        let handle = bus.attach(indicator);

        bus.publish(Event::Connecting { id: JobId(1) });
        state.changed().await.unwrap();
        assert!(matches!(
            *state.borrow_and_update(),
            IndicatorState::Indeterminate { .. }
        ));

        bus.publish(Event::Shutdown);
        handle.await.unwrap();
        assert_eq!(*state.borrow(), IndicatorState::Hidden);
    }
}
