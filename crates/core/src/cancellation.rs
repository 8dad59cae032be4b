//! Session cancellation requests and the dispute they can escalate into.
//!
//! Flow: a party files a request against an active session, the counterparty
//! either agrees (session canceled) or disputes (session disputed), and an
//! admin settles disputes. A request is terminal once its resolution is no
//! longer `pending`.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::session::{validate_description, SessionState};
use crate::types::{CancelRequestId, SessionId, Timestamp, UserId};

/// Maximum number of evidence attachments per request.
pub const MAX_EVIDENCE_FILES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelResponseStatus {
    Pending,
    Agreed,
    Disputed,
}

impl CancelResponseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CancelResponseStatus::Pending => "pending",
            CancelResponseStatus::Agreed => "agreed",
            CancelResponseStatus::Disputed => "disputed",
        }
    }

    pub fn parse(value: &str) -> CoreResult<Self> {
        match value {
            "pending" => Ok(CancelResponseStatus::Pending),
            "agreed" => Ok(CancelResponseStatus::Agreed),
            "disputed" => Ok(CancelResponseStatus::Disputed),
            other => Err(CoreError::Validation(format!(
                "Invalid cancel response status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelResolution {
    Pending,
    Canceled,
    PartialCompletion,
    Continued,
}

impl CancelResolution {
    pub fn as_str(self) -> &'static str {
        match self {
            CancelResolution::Pending => "pending",
            CancelResolution::Canceled => "canceled",
            CancelResolution::PartialCompletion => "partial_completion",
            CancelResolution::Continued => "continued",
        }
    }

    pub fn parse(value: &str) -> CoreResult<Self> {
        match value {
            "pending" => Ok(CancelResolution::Pending),
            "canceled" => Ok(CancelResolution::Canceled),
            "partial_completion" => Ok(CancelResolution::PartialCompletion),
            "continued" => Ok(CancelResolution::Continued),
            other => Err(CoreError::Validation(format!(
                "Invalid cancel resolution '{other}'"
            ))),
        }
    }

    /// Parse a resolution an admin may hand down on a dispute.
    pub fn parse_admin(value: &str) -> CoreResult<Self> {
        match Self::parse(value)? {
            CancelResolution::Pending => Err(CoreError::Validation(
                "A dispute cannot be resolved to 'pending'".into(),
            )),
            other => Ok(other),
        }
    }

    /// Session state that follows from settling a dispute this way.
    pub fn session_outcome(self) -> Option<SessionState> {
        match self {
            CancelResolution::Pending => None,
            CancelResolution::Continued => Some(SessionState::Active),
            CancelResolution::Canceled | CancelResolution::PartialCompletion => {
                Some(SessionState::Canceled)
            }
        }
    }
}

/// The counterparty's answer to a cancellation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelResponse {
    Agree,
    Dispute,
}

impl CancelResponse {
    /// Request status and resolution after this response.
    pub fn recorded_as(self) -> (CancelResponseStatus, CancelResolution) {
        match self {
            CancelResponse::Agree => (CancelResponseStatus::Agreed, CancelResolution::Canceled),
            CancelResponse::Dispute => (CancelResponseStatus::Disputed, CancelResolution::Pending),
        }
    }

    /// Session state that follows from this response.
    pub fn session_outcome(self) -> SessionState {
        match self {
            CancelResponse::Agree => SessionState::Canceled,
            CancelResponse::Dispute => SessionState::Disputed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionCancelRequest {
    pub id: CancelRequestId,
    pub session_id: SessionId,
    pub initiator_id: UserId,
    pub reason: String,
    pub description: Option<String>,
    pub evidence_files: Vec<String>,
    pub response_status: CancelResponseStatus,
    pub resolution: CancelResolution,
    pub responded_at: Option<Timestamp>,
    pub resolved_at: Option<Timestamp>,
    pub resolved_by: Option<UserId>,
    pub admin_notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl SessionCancelRequest {
    pub fn is_open(&self) -> bool {
        self.resolution == CancelResolution::Pending
    }
}

/// Input for filing a cancellation request.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCancelRequest {
    pub session_id: SessionId,
    pub initiator_id: UserId,
    pub reason: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub evidence_files: Vec<String>,
}

impl NewCancelRequest {
    pub fn validate(&self) -> CoreResult<()> {
        validate_description("reason", &self.reason)?;
        if let Some(desc) = &self.description {
            validate_description("description", desc)?;
        }
        if self.evidence_files.len() > MAX_EVIDENCE_FILES {
            return Err(CoreError::Validation(format!(
                "At most {MAX_EVIDENCE_FILES} evidence files may be attached"
            )));
        }
        if self.evidence_files.iter().any(|f| f.trim().is_empty()) {
            return Err(CoreError::Validation(
                "evidence_files must not contain blank entries".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_request() -> NewCancelRequest {
        NewCancelRequest {
            session_id: 1,
            initiator_id: 1,
            reason: "Moving abroad".into(),
            description: None,
            evidence_files: vec!["uploads/ticket.pdf".into()],
        }
    }

    #[test]
    fn valid_request_passes() {
        assert!(new_request().validate().is_ok());
    }

    #[test]
    fn reason_required() {
        let mut input = new_request();
        input.reason = String::new();
        assert!(input.validate().is_err());
    }

    #[test]
    fn too_many_evidence_files() {
        let mut input = new_request();
        input.evidence_files = (0..=MAX_EVIDENCE_FILES).map(|i| format!("f{i}")).collect();
        assert!(input.validate().is_err());
    }

    #[test]
    fn admin_cannot_resolve_to_pending() {
        assert!(CancelResolution::parse_admin("pending").is_err());
        assert_eq!(
            CancelResolution::parse_admin("continued").unwrap(),
            CancelResolution::Continued
        );
    }

    #[test]
    fn session_outcomes() {
        assert_eq!(
            CancelResolution::Continued.session_outcome(),
            Some(SessionState::Active)
        );
        assert_eq!(
            CancelResolution::PartialCompletion.session_outcome(),
            Some(SessionState::Canceled)
        );
        assert_eq!(CancelResolution::Pending.session_outcome(), None);
    }
}
