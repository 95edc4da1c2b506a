//! Event bus
//!
//! Process-wide multi-subscriber fan-out of [`DownloadEvent`]s. The bus is
//! an explicit, injectable object: tests publish synthetic events directly
//! and components hold their own subscriptions instead of reaching through
//! ambient global state.
//!
//! Delivery is in publish order to every subscriber registered before the
//! event was published. Filtering by key happens subscriber-side via
//! [`DownloadEvent::key`].

use crate::protocol::DownloadEvent;
use tokio::sync::broadcast;

/// Default number of events to buffer per subscriber
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Multi-subscriber broadcast bus for download events
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DownloadEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per lagging subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Publishing with no subscribers is not an error; the event is dropped.
    pub fn publish(&self, event: DownloadEvent) {
        let _ = self.tx.send(event);
    }

    /// Subscribe to all subsequently published events
    pub fn subscribe(&self) -> broadcast::Receiver<DownloadEvent> {
        self.tx.subscribe()
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::DownloadKey;

    fn key(s: &str) -> DownloadKey {
        DownloadKey::parse(s).unwrap()
    }

    #[tokio::test]
    async fn delivers_events_in_publish_order() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(DownloadEvent::Progress {
            key: key("https://host/a.m3u8"),
            percent: 10.0,
        });
        bus.publish(DownloadEvent::Progress {
            key: key("https://host/a.m3u8"),
            percent: 20.0,
        });

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(
            (first.key().as_str(), second.key().as_str()),
            ("https://host/a.m3u8", "https://host/a.m3u8")
        );
        assert!(matches!(first, DownloadEvent::Progress { percent, .. } if percent == 10.0));
        assert!(matches!(second, DownloadEvent::Progress { percent, .. } if percent == 20.0));
    }

    #[tokio::test]
    async fn late_subscribers_miss_earlier_events() {
        let bus = EventBus::default();
        // Keep one receiver alive so publishes are not dropped entirely.
        let _early = bus.subscribe();

        bus.publish(DownloadEvent::Failed {
            key: key("https://host/a.m3u8"),
            error: "network lost".into(),
        });

        let mut late = bus.subscribe();
        bus.publish(DownloadEvent::Progress {
            key: key("https://host/a.m3u8"),
            percent: 5.0,
        });

        let event = late.recv().await.unwrap();
        assert!(matches!(event, DownloadEvent::Progress { .. }));
    }

    #[test]
    fn publish_without_subscribers_is_a_no_op() {
        let bus = EventBus::new(4);
        assert_eq!(bus.subscriber_count(), 0);
        bus.publish(DownloadEvent::Completed {
            key: key("https://host/a.m3u8"),
            location: "/store/a.mov".into(),
        });
    }

    #[tokio::test]
    async fn independent_subscribers_each_see_every_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(DownloadEvent::Completed {
            key: key("https://host/a.m3u8"),
            location: "/store/a.mov".into(),
        });

        assert!(matches!(rx1.recv().await.unwrap(), DownloadEvent::Completed { .. }));
        assert!(matches!(rx2.recv().await.unwrap(), DownloadEvent::Completed { .. }));
    }
}
