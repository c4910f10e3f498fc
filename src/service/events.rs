//! Event fan-out from the worker to any number of subscribers.

use crate::types::Event;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, mpsc};

/// Publish/subscribe hub for lifecycle events
///
/// Publishing never blocks and never fails: with no subscribers the event is dropped.
/// Two kinds of consumers are supported:
/// - raw receivers from [`subscribe`](Self::subscribe) share a bounded ring of
///   `capacity` events; one that falls behind loses the oldest events (`Lagged`)
/// - subscribers registered with [`attach`](Self::attach) each get an unbounded
///   inbox and see every event, however slow they are
///
/// Events are delivered to every consumer in publication order.
#[derive(Clone, Debug)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
    attached: Arc<Mutex<Vec<mpsc::UnboundedSender<Event>>>>,
}

impl EventBus {
    /// Create a bus retaining up to `capacity` events for slow raw receivers
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            attached: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Offer an event to every current subscriber (fire-and-forget)
    pub fn publish(&self, event: Event) {
        tracing::trace!(event = event.event_type(), job_id = ?event.job_id(), "Publishing event");
        // Held across both sends so concurrent publishers agree on one order
        let mut attached = self.lock_attached();
        attached.retain(|inbox| inbox.send(event.clone()).is_ok());
        // send() returns Err if there are no receivers, which is fine - we just drop the event
        self.tx.send(event).ok();
    }

    /// Register a new raw receiver; it sees events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Number of live raw receivers and attached subscribers
    pub fn subscriber_count(&self) -> usize {
        let attached = self.lock_attached();
        self.tx.receiver_count() + attached.iter().filter(|inbox| !inbox.is_closed()).count()
    }

    /// Feed a subscriber from its own task. Must be called within a tokio runtime.
    pub fn attach<S: EventSubscriber>(&self, subscriber: S) -> tokio::task::JoinHandle<()> {
        tokio::spawn(run_subscriber(self.register(), subscriber))
    }

    /// Open an unbounded inbox that receives every event published from now on
    pub(crate) fn register(&self) -> mpsc::UnboundedReceiver<Event> {
        let (inbox, rx) = mpsc::unbounded_channel();
        self.lock_attached().push(inbox);
        rx
    }

    fn lock_attached(&self) -> MutexGuard<'_, Vec<mpsc::UnboundedSender<Event>>> {
        self.attached.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Something that wants to observe lifecycle events (status indicator, UI bridge, ...)
///
/// Each attached subscriber runs on its own task and sees every event in order,
/// until the bus is dropped or a `Shutdown` event has been handled.
#[async_trait]
pub trait EventSubscriber: Send + 'static {
    /// Handle one event
    async fn on_event(&mut self, event: &Event);

    /// Human-readable name for logging
    fn name(&self) -> &'static str {
        "subscriber"
    }
}

pub(crate) async fn run_subscriber<S: EventSubscriber>(
    mut inbox: mpsc::UnboundedReceiver<Event>,
    mut subscriber: S,
) {
    while let Some(event) = inbox.recv().await {
        subscriber.on_event(&event).await;
        if matches!(event, Event::Shutdown) {
            break;
        }
    }
    tracing::debug!(subscriber = subscriber.name(), "Subscriber detached");
}
