//! Shared test helpers: a scripted fetch engine and event collection.

use crate::config::Config;
use crate::error::{Error, FetchError};
use crate::service::FetchService;
use crate::source::ProgressSource;
use crate::types::{Event, ProgressSnapshot};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

/// Fetch engine whose timing, progress and outcome are controlled by the test
pub(crate) struct ScriptedSource {
    delay: Duration,
    steps: u64,
    snapshot: Mutex<ProgressSnapshot>,
    failures: Mutex<HashMap<String, String>>,
    panics: Mutex<HashSet<String>>,
    calls: Mutex<Vec<(&'static str, String)>>,
    fail_snapshots: AtomicBool,
    panic_snapshots: AtomicBool,
    active: AtomicUsize,
    max_active: AtomicUsize,
    gate: tokio::sync::watch::Sender<bool>,
}

struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedSource {
    /// Instant fetches with no progress steps
    pub(crate) fn new() -> Self {
        let (gate, _) = tokio::sync::watch::channel(true);
        Self {
            delay: Duration::ZERO,
            steps: 0,
            snapshot: Mutex::new(ProgressSnapshot::default()),
            failures: Mutex::new(HashMap::new()),
            panics: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            fail_snapshots: AtomicBool::new(false),
            panic_snapshots: AtomicBool::new(false),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            gate,
        }
    }

    /// Each fetch takes `delay`, spread over `steps` progress updates
    pub(crate) fn with_timing(mut self, delay: Duration, steps: u64) -> Self {
        self.delay = delay;
        self.steps = steps;
        self
    }

    /// Fail any fetch of `identifier` with `reason`
    pub(crate) fn fail_on(self, identifier: &str, reason: &str) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(identifier.to_string(), reason.to_string());
        self
    }

    /// Panic inside any fetch of `identifier`
    pub(crate) fn panic_on(self, identifier: &str) -> Self {
        self.panics.lock().unwrap().insert(identifier.to_string());
        self
    }

    /// Hold every fetch at its end until [`release`](Self::release) is called
    pub(crate) fn hold(&self) {
        self.gate.send_replace(false);
    }

    /// Let held fetches finish
    pub(crate) fn release(&self) {
        self.gate.send_replace(true);
    }

    pub(crate) fn set_snapshot(&self, snapshot: ProgressSnapshot) {
        *self.snapshot.lock().unwrap() = snapshot;
    }

    pub(crate) fn fail_snapshots(&self, fail: bool) {
        self.fail_snapshots.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn panic_snapshots(&self, panic: bool) {
        self.panic_snapshots.store(panic, Ordering::SeqCst);
    }

    /// Every fetch call so far as (kind, identifier), in call order
    pub(crate) fn calls(&self) -> Vec<(&'static str, String)> {
        self.calls.lock().unwrap().clone()
    }

    /// Highest number of fetches that ever ran at the same time
    pub(crate) fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    async fn run(&self, kind: &'static str, identifier: &str) -> crate::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((kind, identifier.to_string()));

        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);
        let _active = ActiveGuard(&self.active);

        if self.panics.lock().unwrap().contains(identifier) {
            panic!("scripted panic for {identifier}");
        }

        self.set_snapshot(ProgressSnapshot::new(0, 0, "Initializing"));
        if self.steps == 0 {
            tokio::time::sleep(self.delay).await;
        } else {
            let step_delay = self.delay / self.steps as u32;
            for step in 1..=self.steps {
                tokio::time::sleep(step_delay).await;
                self.set_snapshot(ProgressSnapshot::new(
                    step,
                    self.steps,
                    format!("Downloading post {step}/{}...", self.steps),
                ));
            }
        }

        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;

        let failure = self.failures.lock().unwrap().get(identifier).cloned();
        match failure {
            Some(reason) => Err(FetchError::Failed(reason).into()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ProgressSource for ScriptedSource {
    async fn fetch_single(&self, identifier: &str) -> crate::Result<()> {
        self.run("single", identifier).await
    }

    async fn fetch_collection(&self, identifier: &str) -> crate::Result<()> {
        self.run("collection", identifier).await
    }

    fn snapshot(&self) -> crate::Result<ProgressSnapshot> {
        if self.panic_snapshots.load(Ordering::SeqCst) {
            panic!("scripted snapshot panic");
        }
        if self.fail_snapshots.load(Ordering::SeqCst) {
            return Err(Error::Snapshot("scripted snapshot failure".to_string()));
        }
        Ok(self.snapshot.lock().unwrap().clone())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Config with a fast poll interval suited to tests
pub(crate) fn test_config() -> Config {
    Config {
        poll_interval: Duration::from_millis(10),
        shutdown_timeout: Duration::from_secs(5),
        ..Config::default()
    }
}

/// Helper to create a service around a scripted source
pub(crate) fn create_test_service(source: Arc<ScriptedSource>) -> FetchService {
    FetchService::with_source(test_config(), source).unwrap()
}

/// Collect events until one matches `stop` (inclusive). Panics after `timeout`.
pub(crate) async fn collect_until(
    rx: &mut broadcast::Receiver<Event>,
    timeout: Duration,
    mut stop: impl FnMut(&Event) -> bool,
) -> Vec<Event> {
    let mut events = Vec::new();
    let result = tokio::time::timeout(timeout, async {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let done = stop(&event);
                    events.push(event);
                    if done {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
    .await;
    assert!(result.is_ok(), "timed out waiting for event, got {events:?}");
    events
}

/// Collect events until the worker reports `Idle`
pub(crate) async fn collect_until_idle(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    collect_until(rx, Duration::from_secs(5), |e| matches!(e, Event::Idle)).await
}

/// The terminal events of a run, in order
pub(crate) fn terminal_events(events: &[Event]) -> Vec<Event> {
    events.iter().filter(|e| e.is_terminal()).cloned().collect()
}
