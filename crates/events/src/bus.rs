//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`PlatformEvent`]s and the
//! [`NotificationSink`] the lifecycle services publish through. Share it via
//! `Arc<EventBus>`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skillswap_core::events::{LifecycleEvent, NotificationSink};
use skillswap_core::types::{DbId, UserId};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// PlatformEvent
// ---------------------------------------------------------------------------

/// A lifecycle transition as it travels over the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformEvent {
    /// Dot-separated event name, e.g. `"session.accepted"`.
    pub event_type: String,

    /// Kind of the entity that changed (e.g. `"session"`, `"meeting"`).
    pub entity_type: String,

    pub entity_id: DbId,

    /// The user whose command caused the event.
    pub actor_user_id: UserId,

    /// Users who should be notified.
    pub recipients: Vec<UserId>,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    /// When the event was published (UTC).
    pub timestamp: DateTime<Utc>,
}

impl From<LifecycleEvent> for PlatformEvent {
    fn from(event: LifecycleEvent) -> Self {
        Self {
            event_type: event.event_type.to_string(),
            entity_type: event.entity_type.to_string(),
            entity_id: event.entity_id,
            actor_user_id: event.actor_id,
            recipients: event.recipients,
            payload: event.payload,
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// ```rust
/// use skillswap_core::events::{entity_types, event_types, LifecycleEvent};
/// use skillswap_events::bus::EventBus;
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(LifecycleEvent::new(event_types::SESSION_PROPOSED, entity_types::SESSION, 1, 2).into());
/// ```
pub struct EventBus {
    sender: broadcast::Sender<PlatformEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest un-consumed messages are dropped
    /// and slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// With no subscribers the event is dropped.
    pub fn publish(&self, event: PlatformEvent) {
        // SendError only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlatformEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl NotificationSink for EventBus {
    fn notify(&self, event: LifecycleEvent) {
        tracing::debug!(
            event_type = event.event_type,
            entity_id = event.entity_id,
            recipients = ?event.recipients,
            "Publishing lifecycle event"
        );
        self.publish(event.into());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use skillswap_core::events::{entity_types, event_types};

    use super::*;

    fn accepted(session_id: DbId) -> LifecycleEvent {
        LifecycleEvent::new(event_types::SESSION_ACCEPTED, entity_types::SESSION, session_id, 2)
            .notify(1)
            .with_payload(serde_json::json!({"status": "active"}))
    }

    #[tokio::test]
    async fn sink_publishes_converted_event() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.notify(accepted(42));

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.event_type, "session.accepted");
        assert_eq!(received.entity_type, "session");
        assert_eq!(received.entity_id, 42);
        assert_eq!(received.actor_user_id, 2);
        assert_eq!(received.recipients, vec![1]);
        assert_eq!(received.payload["status"], "active");
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.notify(accepted(7));

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");
        assert_eq!(e1.entity_id, 7);
        assert_eq!(e2.entity_id, 7);
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.notify(accepted(1));
    }

    #[tokio::test]
    async fn slow_subscriber_observes_lag() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();
        for id in 0..5 {
            bus.notify(accepted(id));
        }
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(3))
        ));
    }
}
