//! Meeting scheduling sub-flow: states, records, and validation.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::session::{require_id, validate_description};
use crate::types::{DbId, MeetingId, Timestamp, UserId};

/// Maximum length of a cancellation reason (characters).
pub const MAX_REASON_LENGTH: usize = 1_000;

/// Lifecycle state of a meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingState {
    Pending,
    Accepted,
    Rejected,
    Cancelled,
    Completed,
}

impl MeetingState {
    pub fn as_str(self) -> &'static str {
        match self {
            MeetingState::Pending => "pending",
            MeetingState::Accepted => "accepted",
            MeetingState::Rejected => "rejected",
            MeetingState::Cancelled => "cancelled",
            MeetingState::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> CoreResult<Self> {
        match value {
            "pending" => Ok(MeetingState::Pending),
            "accepted" => Ok(MeetingState::Accepted),
            "rejected" => Ok(MeetingState::Rejected),
            "cancelled" => Ok(MeetingState::Cancelled),
            "completed" => Ok(MeetingState::Completed),
            other => Err(CoreError::Validation(format!(
                "Invalid meeting state '{other}'"
            ))),
        }
    }

    /// Returns the set of states that `self` may transition to.
    ///
    /// - `pending`  -> `accepted`, `rejected`, `cancelled`
    /// - `accepted` -> `cancelled`, `completed`
    pub fn valid_transitions(self) -> &'static [MeetingState] {
        match self {
            MeetingState::Pending => &[
                MeetingState::Accepted,
                MeetingState::Rejected,
                MeetingState::Cancelled,
            ],
            MeetingState::Accepted => &[MeetingState::Cancelled, MeetingState::Completed],
            MeetingState::Rejected | MeetingState::Cancelled | MeetingState::Completed => &[],
        }
    }

    pub fn can_transition_to(self, next: MeetingState) -> bool {
        self.valid_transitions().contains(&next)
    }
}

/// Validate that a meeting may move from `current` to `next`.
pub fn validate_transition(current: MeetingState, next: MeetingState) -> CoreResult<()> {
    if current.can_transition_to(next) {
        Ok(())
    } else {
        Err(CoreError::Conflict(format!(
            "Cannot move meeting from '{current}' to '{next}'"
        )))
    }
}

impl std::fmt::Display for MeetingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The receiver's answer to a pending meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingDecision {
    Accept,
    Reject,
}

impl MeetingDecision {
    pub fn target_state(self) -> MeetingState {
        match self {
            MeetingDecision::Accept => MeetingState::Accepted,
            MeetingDecision::Reject => MeetingState::Rejected,
        }
    }
}

/// A scheduled real-time encounter between two users.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Meeting {
    pub id: MeetingId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub description: String,
    pub meeting_time: Timestamp,
    pub meeting_link: Option<String>,
    pub state: MeetingState,
    pub accept_status: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Meeting {
    pub fn is_party(&self, user_id: UserId) -> bool {
        self.sender_id == user_id || self.receiver_id == user_id
    }
}

/// Input for proposing a meeting.
#[derive(Debug, Clone, Deserialize)]
pub struct NewMeeting {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub description: String,
    pub meeting_time: Timestamp,
    #[serde(default)]
    pub meeting_link: Option<String>,
}

impl NewMeeting {
    pub fn validate(&self) -> CoreResult<()> {
        require_id("sender_id", self.sender_id)?;
        require_id("receiver_id", self.receiver_id)?;
        validate_description("description", &self.description)?;
        if self.sender_id == self.receiver_id {
            return Err(CoreError::Validation(
                "A meeting needs two distinct users".into(),
            ));
        }
        if let Some(link) = &self.meeting_link {
            validate_meeting_link(link)?;
        }
        Ok(())
    }
}

/// Cancellation record for a meeting, acknowledged by the other party.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CancelMeeting {
    pub id: DbId,
    pub meeting_id: MeetingId,
    pub cancelled_by: UserId,
    pub reason: String,
    pub acknowledged: bool,
    pub acknowledged_by: Option<UserId>,
    pub acknowledged_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// Accept only http(s) links.
pub fn validate_meeting_link(link: &str) -> CoreResult<()> {
    let trimmed = link.trim();
    if trimmed.starts_with("https://") || trimmed.starts_with("http://") {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "meeting_link must be an http(s) URL, got '{trimmed}'"
        )))
    }
}

/// A cancellation must say why.
pub fn validate_cancel_reason(reason: &str) -> CoreResult<()> {
    if reason.trim().is_empty() {
        return Err(CoreError::Validation("reason is required".into()));
    }
    if reason.chars().count() > MAX_REASON_LENGTH {
        return Err(CoreError::Validation(format!(
            "reason exceeds maximum length of {MAX_REASON_LENGTH} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn new_meeting() -> NewMeeting {
        NewMeeting {
            sender_id: 1,
            receiver_id: 2,
            description: "Intro call".into(),
            meeting_time: Utc::now(),
            meeting_link: Some("https://meet.example.com/abc".into()),
        }
    }

    #[test]
    fn pending_can_be_answered_or_withdrawn() {
        assert!(MeetingState::Pending.can_transition_to(MeetingState::Accepted));
        assert!(MeetingState::Pending.can_transition_to(MeetingState::Rejected));
        assert!(MeetingState::Pending.can_transition_to(MeetingState::Cancelled));
        assert!(!MeetingState::Pending.can_transition_to(MeetingState::Completed));
    }

    #[test]
    fn accepted_can_cancel_or_complete() {
        assert!(MeetingState::Accepted.can_transition_to(MeetingState::Cancelled));
        assert!(MeetingState::Accepted.can_transition_to(MeetingState::Completed));
        assert!(!MeetingState::Accepted.can_transition_to(MeetingState::Rejected));
    }

    #[test]
    fn rejected_and_completed_are_terminal() {
        assert!(MeetingState::Rejected.valid_transitions().is_empty());
        assert!(MeetingState::Completed.valid_transitions().is_empty());
    }

    #[test]
    fn state_parse_round_trips_known_values() {
        for s in ["pending", "accepted", "rejected", "cancelled", "completed"] {
            assert_eq!(MeetingState::parse(s).unwrap().as_str(), s);
        }
        assert!(MeetingState::parse("canceled").is_err());
    }

    #[test]
    fn decision_targets() {
        assert_eq!(MeetingDecision::Accept.target_state(), MeetingState::Accepted);
        assert_eq!(MeetingDecision::Reject.target_state(), MeetingState::Rejected);
    }

    #[test]
    fn new_meeting_valid() {
        assert!(new_meeting().validate().is_ok());
    }

    #[test]
    fn new_meeting_rejects_self_meeting() {
        let mut input = new_meeting();
        input.receiver_id = input.sender_id;
        assert!(input.validate().is_err());
    }

    #[test]
    fn new_meeting_rejects_bad_link() {
        let mut input = new_meeting();
        input.meeting_link = Some("ftp://example.com".into());
        assert!(input.validate().is_err());
    }

    #[test]
    fn blank_cancel_reason_rejected() {
        assert!(validate_cancel_reason("  ").is_err());
        assert!(validate_cancel_reason("schedule conflict").is_ok());
    }
}
