//! Completion handshake and per-user progress tracking.
//!
//! A session completes only when both sides are covered by an approved
//! completion request. Progress rows are advisory and never drive the
//! session status.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::session::PartySide;
use crate::types::{CompletionRequestId, SessionId, Timestamp, UserId};

// ---------------------------------------------------------------------------
// Decision constants
// ---------------------------------------------------------------------------

pub const DECISION_APPROVED: &str = "approved";
pub const DECISION_REJECTED: &str = "rejected";

/// All valid decision values.
pub const VALID_DECISIONS: &[&str] = &[DECISION_APPROVED, DECISION_REJECTED];

/// Maximum length for progress notes (characters).
pub const MAX_NOTES_LENGTH: usize = 5_000;

// ---------------------------------------------------------------------------
// Completion requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    Pending,
    Approved,
    Rejected,
}

impl CompletionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CompletionStatus::Pending => "pending",
            CompletionStatus::Approved => "approved",
            CompletionStatus::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> CoreResult<Self> {
        match value {
            "pending" => Ok(CompletionStatus::Pending),
            "approved" => Ok(CompletionStatus::Approved),
            "rejected" => Ok(CompletionStatus::Rejected),
            other => Err(CoreError::Validation(format!(
                "Invalid completion status '{other}'"
            ))),
        }
    }
}

/// Which side(s) of the session a completion request speaks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestForUser {
    User1,
    User2,
    /// Filed by an admin on behalf of both parties.
    Both,
}

impl RequestForUser {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestForUser::User1 => "user1",
            RequestForUser::User2 => "user2",
            RequestForUser::Both => "both",
        }
    }

    pub fn parse(value: &str) -> CoreResult<Self> {
        match value {
            "user1" => Ok(RequestForUser::User1),
            "user2" => Ok(RequestForUser::User2),
            "both" => Ok(RequestForUser::Both),
            other => Err(CoreError::Validation(format!(
                "Invalid request_for_user '{other}'"
            ))),
        }
    }

    pub fn covers(self, side: PartySide) -> bool {
        match self {
            RequestForUser::Both => true,
            RequestForUser::User1 => side == PartySide::User1,
            RequestForUser::User2 => side == PartySide::User2,
        }
    }
}

impl From<PartySide> for RequestForUser {
    fn from(side: PartySide) -> Self {
        match side {
            PartySide::User1 => RequestForUser::User1,
            PartySide::User2 => RequestForUser::User2,
        }
    }
}

/// One party's claim that their side of the exchange is done.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub id: CompletionRequestId,
    pub session_id: SessionId,
    pub requested_by: UserId,
    pub request_for_user: RequestForUser,
    pub status: CompletionStatus,
    pub approved_at: Option<Timestamp>,
    pub approved_by: Option<UserId>,
    pub rejection_reason: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A validated decision on a pending completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionDecision {
    Approve,
    Reject { reason: String },
}

impl CompletionDecision {
    /// Build a decision from its wire form. Rejections must carry a reason.
    pub fn parse(decision: &str, rejection_reason: Option<&str>) -> CoreResult<Self> {
        match decision {
            DECISION_APPROVED => Ok(CompletionDecision::Approve),
            DECISION_REJECTED => match rejection_reason.map(str::trim) {
                Some(reason) if !reason.is_empty() => Ok(CompletionDecision::Reject {
                    reason: reason.to_string(),
                }),
                _ => Err(CoreError::Validation(
                    "rejection_reason is required when rejecting a completion request".into(),
                )),
            },
            other => Err(CoreError::Validation(format!(
                "Invalid decision '{other}'. Must be one of: {}",
                VALID_DECISIONS.join(", ")
            ))),
        }
    }

    pub fn target_status(&self) -> CompletionStatus {
        match self {
            CompletionDecision::Approve => CompletionStatus::Approved,
            CompletionDecision::Reject { .. } => CompletionStatus::Rejected,
        }
    }
}

/// Returns `true` when both sides are covered by an approved request.
pub fn both_sides_approved(requests: &[CompletionRequest]) -> bool {
    let approved = || {
        requests
            .iter()
            .filter(|r| r.status == CompletionStatus::Approved)
    };
    let covered = |side| approved().any(|r| r.request_for_user.covers(side));
    covered(PartySide::User1) && covered(PartySide::User2)
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    NotStarted,
    InProgress,
    Completed,
    Abandoned,
}

impl ProgressStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProgressStatus::NotStarted => "not_started",
            ProgressStatus::InProgress => "in_progress",
            ProgressStatus::Completed => "completed",
            ProgressStatus::Abandoned => "abandoned",
        }
    }

    pub fn parse(value: &str) -> CoreResult<Self> {
        match value {
            "not_started" => Ok(ProgressStatus::NotStarted),
            "in_progress" => Ok(ProgressStatus::InProgress),
            "completed" => Ok(ProgressStatus::Completed),
            "abandoned" => Ok(ProgressStatus::Abandoned),
            other => Err(CoreError::Validation(format!(
                "Invalid progress status '{other}'"
            ))),
        }
    }

    /// Status implied by a completion percentage when none is given.
    pub fn from_percentage(pct: i16) -> Self {
        match pct {
            i16::MIN..=0 => ProgressStatus::NotStarted,
            100..=i16::MAX => ProgressStatus::Completed,
            _ => ProgressStatus::InProgress,
        }
    }
}

/// One user's self-reported progress on a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionProgress {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub completion_percentage: i16,
    pub status: ProgressStatus,
    pub notes: Option<String>,
    pub updated_at: Timestamp,
}

/// A progress write for one (session, user) row.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub completion_percentage: i16,
    pub status: ProgressStatus,
    pub notes: Option<String>,
}

/// Clamp a completion percentage into `0..=100`.
pub fn clamp_percentage(pct: i32) -> i16 {
    pct.clamp(0, 100) as i16
}

pub fn validate_notes(notes: &str) -> CoreResult<()> {
    if notes.chars().count() > MAX_NOTES_LENGTH {
        return Err(CoreError::Validation(format!(
            "notes exceed maximum length of {MAX_NOTES_LENGTH} characters"
        )));
    }
    Ok(())
}
