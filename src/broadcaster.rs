//! Broadcast hub for pushing named events to connected viewers
//!
//! Events are serialized once and fanned out over a bounded broadcast ring.
//! Delivery is best-effort: with no subscribers a publish is a no-op, and a
//! subscriber that falls behind drops the oldest frames rather than queuing
//! without bound. Every event is a full-state push, so a dropped frame is
//! repaired by the next one.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::warn;

/// Wire frame sent to every subscriber
#[derive(Serialize)]
struct EventFrame<'a, T: Serialize> {
    event: &'a str,
    data: &'a T,
}

/// Serialize a named event into its wire frame
pub fn event_frame<T: Serialize>(event: &str, data: &T) -> serde_json::Result<String> {
    serde_json::to_string(&EventFrame { event, data })
}

#[derive(Clone)]
pub struct EventBroadcaster {
    tx: broadcast::Sender<String>,
}

impl EventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Register a new subscriber. The receiver only sees events published
    /// after this call; earlier state comes from the snapshot queries.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Publish a named event to all current subscribers, best-effort.
    pub fn publish<T: Serialize>(&self, event: &str, data: &T) {
        if self.tx.receiver_count() == 0 {
            return;
        }
        match event_frame(event, data) {
            Ok(frame) => {
                // Send only fails when every receiver is already gone
                let _ = self.tx.send(frame);
            }
            Err(e) => warn!("Failed to serialize {} event: {}", event, e),
        }
    }
}
