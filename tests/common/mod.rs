//! Common test utilities for fetch-queue integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use fetch_queue::{Config, Event, FetchError, FetchService, ProgressSnapshot, ProgressSource};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

/// Fetch engine that counts through `steps` items per fetch
pub struct FakeSource {
    step_delay: Duration,
    steps: u64,
    snapshot: Mutex<ProgressSnapshot>,
    failures: HashMap<String, String>,
    calls: Mutex<Vec<(&'static str, String)>>,
}

impl FakeSource {
    pub fn new(steps: u64, step_delay: Duration) -> Self {
        Self {
            step_delay,
            steps,
            snapshot: Mutex::new(ProgressSnapshot::default()),
            failures: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(mut self, identifier: &str, reason: &str) -> Self {
        self.failures
            .insert(identifier.to_string(), reason.to_string());
        self
    }

    pub fn calls(&self) -> Vec<(&'static str, String)> {
        self.calls.lock().unwrap().clone()
    }

    async fn run(&self, kind: &'static str, identifier: &str) -> fetch_queue::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((kind, identifier.to_string()));
        *self.snapshot.lock().unwrap() = ProgressSnapshot::new(0, 0, "Initializing");

        for step in 1..=self.steps {
            tokio::time::sleep(self.step_delay).await;
            *self.snapshot.lock().unwrap() =
                ProgressSnapshot::new(step, self.steps, format!("Item {step}/{}", self.steps));
        }

        match self.failures.get(identifier) {
            Some(reason) => Err(FetchError::Failed(reason.clone()).into()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ProgressSource for FakeSource {
    async fn fetch_single(&self, identifier: &str) -> fetch_queue::Result<()> {
        self.run("single", identifier).await
    }

    async fn fetch_collection(&self, identifier: &str) -> fetch_queue::Result<()> {
        self.run("collection", identifier).await
    }

    fn snapshot(&self) -> fetch_queue::Result<ProgressSnapshot> {
        Ok(self.snapshot.lock().unwrap().clone())
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Config with a fast poll interval
pub fn fast_config() -> Config {
    Config {
        poll_interval: Duration::from_millis(10),
        ..Config::default()
    }
}

pub fn service_with(source: Arc<FakeSource>) -> FetchService {
    FetchService::with_source(fast_config(), source).unwrap()
}

/// Collect events until `count` terminal events were seen, then until the worker is idle
pub async fn collect_terminals(rx: &mut broadcast::Receiver<Event>, count: usize) -> Vec<Event> {
    let mut events = Vec::new();
    let mut terminals = 0;
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let Ok(event) = rx.recv().await else { continue };
            if event.is_terminal() {
                terminals += 1;
            }
            let idle = matches!(event, Event::Idle);
            events.push(event);
            if terminals >= count && idle {
                break;
            }
        }
    })
    .await
    .expect("timed out collecting events");
    events
}

/// Events belonging to one job, in order, excluding `Queued`
pub fn job_events(events: &[Event], id: fetch_queue::JobId) -> Vec<Event> {
    events
        .iter()
        .filter(|e| e.job_id() == Some(id) && !matches!(e, Event::Queued { .. }))
        .cloned()
        .collect()
}
