//! Skill-exchange session model, lifecycle states, and validation.
//!
//! A session carries a single [`SessionState`]. The externally visible
//! `status` string and the tri-state `is_accepted` flag are both derived from
//! it, so the two can never disagree for a record held in memory. Stored rows
//! written by older tooling may still drift; [`SessionState::reconcile`] is the
//! repair rule applied to them.

use serde::{Deserialize, Serialize, Serializer};

use crate::error::{CoreError, CoreResult};
use crate::types::{SessionId, SkillId, Timestamp, UserId};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum number of concurrent pending proposals from one proposer to the
/// same receiver.
pub const MAX_PENDING_PROPOSALS_PER_PAIR: usize = 3;

/// Maximum length of a service description (characters).
pub const MAX_DESCRIPTION_LENGTH: usize = 2_000;

// ---------------------------------------------------------------------------
// Status (wire form)
// ---------------------------------------------------------------------------

/// Externally visible session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    Active,
    Canceled,
    Completed,
    Disputed,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Active => "active",
            SessionStatus::Canceled => "canceled",
            SessionStatus::Completed => "completed",
            SessionStatus::Disputed => "disputed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(SessionStatus::Pending),
            "active" => Some(SessionStatus::Active),
            "canceled" => Some(SessionStatus::Canceled),
            "completed" => Some(SessionStatus::Completed),
            "disputed" => Some(SessionStatus::Disputed),
            _ => None,
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// State (domain form)
// ---------------------------------------------------------------------------

/// Lifecycle state of a session.
///
/// `Declined` and `Canceled` both surface as `status = "canceled"`; they
/// differ only in whether the receiver ever accepted (`is_accepted`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Proposed, awaiting the receiver's decision.
    Pending,
    /// The receiver rejected the proposal.
    Declined,
    Active,
    Completed,
    /// A cancellation request was contested and awaits an admin decision.
    Disputed,
    /// Accepted, then canceled by agreement or dispute resolution.
    Canceled,
}

impl SessionState {
    /// The externally visible status string.
    pub fn status(self) -> SessionStatus {
        match self {
            SessionState::Pending => SessionStatus::Pending,
            SessionState::Declined | SessionState::Canceled => SessionStatus::Canceled,
            SessionState::Active => SessionStatus::Active,
            SessionState::Completed => SessionStatus::Completed,
            SessionState::Disputed => SessionStatus::Disputed,
        }
    }

    /// The legacy tri-state acceptance flag.
    pub fn is_accepted(self) -> Option<bool> {
        match self {
            SessionState::Pending => None,
            SessionState::Declined => Some(false),
            SessionState::Active
            | SessionState::Completed
            | SessionState::Disputed
            | SessionState::Canceled => Some(true),
        }
    }

    /// Returns `true` when no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Declined | SessionState::Completed | SessionState::Canceled
        )
    }

    /// Returns the set of states that `self` may transition to.
    ///
    /// - `pending`  -> `active`, `declined`
    /// - `active`   -> `completed`, `disputed`, `canceled`
    /// - `disputed` -> `active`, `canceled`
    pub fn valid_transitions(self) -> &'static [SessionState] {
        match self {
            SessionState::Pending => &[SessionState::Active, SessionState::Declined],
            SessionState::Active => &[
                SessionState::Completed,
                SessionState::Disputed,
                SessionState::Canceled,
            ],
            SessionState::Disputed => &[SessionState::Active, SessionState::Canceled],
            SessionState::Declined | SessionState::Completed | SessionState::Canceled => &[],
        }
    }

    pub fn can_transition_to(self, next: SessionState) -> bool {
        self.valid_transitions().contains(&next)
    }

    /// Rebuild a state from its stored parts, rejecting combinations that
    /// violate the acceptance/status invariant.
    pub fn from_parts(is_accepted: Option<bool>, status: &str) -> CoreResult<Self> {
        let state = Self::reconcile(is_accepted, status);
        if state.status().as_str() == status {
            Ok(state)
        } else {
            Err(CoreError::Validation(format!(
                "Inconsistent session state: is_accepted={is_accepted:?}, status='{status}'"
            )))
        }
    }

    /// Recompute the state from the acceptance flag, keeping the stored status
    /// only where it is compatible with that flag.
    ///
    /// - `null`  -> `pending`
    /// - `false` -> `canceled` (declined)
    /// - `true`  -> the stored status if it is one of `active`, `completed`,
    ///   `disputed`, `canceled`; otherwise `active`
    pub fn reconcile(is_accepted: Option<bool>, status: &str) -> Self {
        match is_accepted {
            None => SessionState::Pending,
            Some(false) => SessionState::Declined,
            Some(true) => match SessionStatus::parse(status) {
                Some(SessionStatus::Completed) => SessionState::Completed,
                Some(SessionStatus::Disputed) => SessionState::Disputed,
                Some(SessionStatus::Canceled) => SessionState::Canceled,
                Some(SessionStatus::Active) | Some(SessionStatus::Pending) | None => {
                    SessionState::Active
                }
            },
        }
    }
}

#[derive(Serialize)]
struct StateParts {
    status: SessionStatus,
    is_accepted: Option<bool>,
}

impl Serialize for SessionState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        StateParts {
            status: self.status(),
            is_accepted: self.is_accepted(),
        }
        .serialize(serializer)
    }
}

/// Validate that a state transition from `current` to `next` is allowed.
pub fn validate_transition(current: SessionState, next: SessionState) -> CoreResult<()> {
    if current.can_transition_to(next) {
        Ok(())
    } else {
        Err(CoreError::Conflict(format!(
            "Cannot move session from '{}' to '{}'",
            current.status(),
            next.status()
        )))
    }
}

// ---------------------------------------------------------------------------
// Parties
// ---------------------------------------------------------------------------

/// Which side of a session a user is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartySide {
    User1,
    User2,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A proposed, ongoing, or finished skill exchange between two users.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub id: SessionId,
    /// The proposer.
    pub user1_id: UserId,
    pub skill1_id: SkillId,
    pub description_of_service1: String,
    /// The receiver of the proposal.
    pub user2_id: UserId,
    pub skill2_id: SkillId,
    pub description_of_service2: String,
    pub start_date: Timestamp,
    pub expected_end_date: Option<Timestamp>,
    #[serde(flatten)]
    pub state: SessionState,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Session {
    pub fn status(&self) -> SessionStatus {
        self.state.status()
    }

    pub fn is_accepted(&self) -> Option<bool> {
        self.state.is_accepted()
    }

    pub fn is_party(&self, user_id: UserId) -> bool {
        self.user1_id == user_id || self.user2_id == user_id
    }

    pub fn side_of(&self, user_id: UserId) -> Option<PartySide> {
        if user_id == self.user1_id {
            Some(PartySide::User1)
        } else if user_id == self.user2_id {
            Some(PartySide::User2)
        } else {
            None
        }
    }

    /// The other party, if `user_id` is one of the two parties.
    pub fn counterparty(&self, user_id: UserId) -> Option<UserId> {
        match self.side_of(user_id)? {
            PartySide::User1 => Some(self.user2_id),
            PartySide::User2 => Some(self.user1_id),
        }
    }
}

/// Input for proposing a new session. `user1_id` is the proposer.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSession {
    pub user1_id: UserId,
    pub skill1_id: SkillId,
    pub description_of_service1: String,
    pub user2_id: UserId,
    pub skill2_id: SkillId,
    pub description_of_service2: String,
    pub start_date: Timestamp,
    #[serde(default)]
    pub expected_end_date: Option<Timestamp>,
}

impl NewSession {
    /// Check required fields, party distinctness, and the date range.
    pub fn validate(&self) -> CoreResult<()> {
        require_id("user1_id", self.user1_id)?;
        require_id("user2_id", self.user2_id)?;
        require_id("skill1_id", self.skill1_id)?;
        require_id("skill2_id", self.skill2_id)?;
        validate_description("description_of_service1", &self.description_of_service1)?;
        validate_description("description_of_service2", &self.description_of_service2)?;

        if self.user1_id == self.user2_id {
            return Err(CoreError::Validation(
                "A session needs two distinct users".into(),
            ));
        }
        if let Some(end) = self.expected_end_date {
            if end < self.start_date {
                return Err(CoreError::Validation(
                    "expected_end_date must not precede start_date".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Acceptance flag and status string exactly as stored, used by the
/// consistency repair pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSessionState {
    pub id: SessionId,
    pub is_accepted: Option<bool>,
    pub status: String,
}

impl StoredSessionState {
    /// Returns the repaired status if the stored one violates the invariant.
    pub fn repaired_status(&self) -> Option<SessionStatus> {
        let state = SessionState::reconcile(self.is_accepted, &self.status);
        if state.status().as_str() == self.status {
            None
        } else {
            Some(state.status())
        }
    }
}

// ---------------------------------------------------------------------------
// Field validation helpers
// ---------------------------------------------------------------------------

/// Reject zero or negative identifiers.
pub fn require_id(field: &str, id: i64) -> CoreResult<()> {
    if id <= 0 {
        return Err(CoreError::Validation(format!(
            "{field} is required and must be positive, got {id}"
        )));
    }
    Ok(())
}

/// Reject blank or oversized free-text fields.
pub fn validate_description(field: &str, value: &str) -> CoreResult<()> {
    if value.trim().is_empty() {
        return Err(CoreError::Validation(format!("{field} is required")));
    }
    if value.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(CoreError::Validation(format!(
            "{field} exceeds maximum length of {MAX_DESCRIPTION_LENGTH} characters"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
