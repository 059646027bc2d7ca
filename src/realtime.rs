//! Fire-and-forget fan-out of lifecycle and presence events.
//!
//! Delivery is at-most-once: a subscriber that falls behind the channel
//! capacity loses the oldest events, and events published while nobody is
//! subscribed are dropped. Clients reconcile by re-reading bookings.

use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::models::event::RealtimeEvent;
use crate::observability::metrics::Metrics;

/// Sink for real-time events. Publishing never fails the caller.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: RealtimeEvent);
}

pub struct Broadcaster {
    tx: broadcast::Sender<RealtimeEvent>,
    metrics: Metrics,
}

impl Broadcaster {
    pub fn new(buffer_size: usize, metrics: Metrics) -> Self {
        let (tx, _unused_rx) = broadcast::channel(buffer_size.max(1));
        Self { tx, metrics }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RealtimeEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl EventPublisher for Broadcaster {
    fn publish(&self, event: RealtimeEvent) {
        let name = event.name();
        self.metrics
            .realtime_events_total
            .with_label_values(&[name])
            .inc();

        match self.tx.send(event) {
            Ok(receivers) => trace!(event = name, receivers, "event published"),
            Err(_) => debug!(event = name, "no subscribers; event dropped"),
        }
    }
}
