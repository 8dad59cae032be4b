//! Lifecycle events emitted on every state transition.
//!
//! The domain only produces events; delivery (in-app, email, persistence)
//! belongs to whatever implements [`NotificationSink`].

use crate::types::{DbId, UserId};

/// Known event type names, dot-separated `<entity>.<transition>`.
pub mod event_types {
    pub const SESSION_PROPOSED: &str = "session.proposed";
    pub const SESSION_ACCEPTED: &str = "session.accepted";
    pub const SESSION_REJECTED: &str = "session.rejected";
    pub const SESSION_COMPLETED: &str = "session.completed";
    pub const SESSION_CANCELED: &str = "session.canceled";
    pub const SESSION_DISPUTED: &str = "session.disputed";
    pub const SESSION_STATUS_REPAIRED: &str = "session.status_repaired";

    pub const COMPLETION_REQUESTED: &str = "completion.requested";
    pub const COMPLETION_APPROVED: &str = "completion.approved";
    pub const COMPLETION_REJECTED: &str = "completion.rejected";

    pub const CANCELLATION_REQUESTED: &str = "cancellation.requested";
    pub const DISPUTE_RESOLVED: &str = "dispute.resolved";

    pub const MEETING_PROPOSED: &str = "meeting.proposed";
    pub const MEETING_ACCEPTED: &str = "meeting.accepted";
    pub const MEETING_REJECTED: &str = "meeting.rejected";
    pub const MEETING_CANCELLED: &str = "meeting.cancelled";
    pub const MEETING_CANCELLATION_ACKNOWLEDGED: &str = "meeting.cancellation_acknowledged";
    pub const MEETING_COMPLETED: &str = "meeting.completed";

    pub const REPORT_FILED: &str = "report.filed";
    pub const REPORT_OPENED: &str = "report.opened";
    pub const REPORT_RESOLVED: &str = "report.resolved";

    pub const USER_WARNED: &str = "user.warned";
    pub const USER_BLOCKED: &str = "user.blocked";
    pub const USER_UNBLOCKED: &str = "user.unblocked";
    pub const USER_SUSPENDED: &str = "user.suspended";
    pub const USER_SUSPENSION_LIFTED: &str = "user.suspension_lifted";
}

/// Known source entity kinds.
pub mod entity_types {
    pub const SESSION: &str = "session";
    pub const COMPLETION_REQUEST: &str = "completion_request";
    pub const CANCEL_REQUEST: &str = "cancel_request";
    pub const MEETING: &str = "meeting";
    pub const REPORT: &str = "report";
    pub const USER: &str = "user";
}

/// A state transition worth telling someone about.
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleEvent {
    pub event_type: &'static str,
    pub entity_type: &'static str,
    pub entity_id: DbId,
    /// The user whose command caused the transition.
    pub actor_id: UserId,
    /// Users who should be notified.
    pub recipients: Vec<UserId>,
    pub payload: serde_json::Value,
}

impl LifecycleEvent {
    pub fn new(
        event_type: &'static str,
        entity_type: &'static str,
        entity_id: DbId,
        actor_id: UserId,
    ) -> Self {
        Self {
            event_type,
            entity_type,
            entity_id,
            actor_id,
            recipients: Vec::new(),
            payload: serde_json::Value::Object(Default::default()),
        }
    }

    pub fn notify(mut self, user_id: UserId) -> Self {
        if !self.recipients.contains(&user_id) {
            self.recipients.push(user_id);
        }
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// Receives lifecycle events. Implementations must not block.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, event: LifecycleEvent);
}

/// A sink that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl NotificationSink for NoopSink {
    fn notify(&self, _event: LifecycleEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipients_are_deduplicated() {
        let event = LifecycleEvent::new(event_types::SESSION_ACCEPTED, entity_types::SESSION, 1, 2)
            .notify(3)
            .notify(3)
            .notify(4);
        assert_eq!(event.recipients, vec![3, 4]);
    }

    #[test]
    fn default_payload_is_empty_object() {
        let event = LifecycleEvent::new(event_types::REPORT_FILED, entity_types::REPORT, 1, 2);
        assert!(event.payload.as_object().is_some_and(|o| o.is_empty()));
    }
}
