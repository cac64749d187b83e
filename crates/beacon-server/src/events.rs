use beacon_common::types::{AlertEvent, HealthCheckResult};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MonitoringEvent {
    HealthCheck(HealthCheckResult),
    AlertTriggered(AlertEvent),
    AlertResolved(AlertEvent),
    /// A swallowed failure, e.g. a rejected observation.
    Error { source: String, message: String },
}

/// Fan-out of [`MonitoringEvent`]s to every live subscriber.
///
/// Channels are unbounded so a slow subscriber never loses events or
/// blocks the publisher. Subscribers whose receiver was dropped are pruned
/// on the next publish.
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<MonitoringEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<MonitoringEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn publish(&self, event: MonitoringEvent) {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        let pruned = before - subscribers.len();
        if pruned > 0 {
            tracing::debug!(pruned, "Dropped closed event subscribers");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }
}
