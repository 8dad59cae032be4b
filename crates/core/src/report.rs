//! In-session report statuses, resolutions, and validation.
//!
//! Reports move `pending -> under_review -> resolved`. Resolution is a
//! one-shot transition, and the admin response text comes from a fixed table
//! keyed by the resolution so that responses stay consistent.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::session::{require_id, validate_description};
use crate::types::{ReportId, SessionId, Timestamp, UserId};

/// Maximum length for admin notes (characters).
pub const MAX_ADMIN_NOTES_LENGTH: usize = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    UnderReview,
    Resolved,
}

impl ReportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::UnderReview => "under_review",
            ReportStatus::Resolved => "resolved",
        }
    }

    pub fn parse(value: &str) -> CoreResult<Self> {
        match value {
            "pending" => Ok(ReportStatus::Pending),
            "under_review" => Ok(ReportStatus::UnderReview),
            "resolved" => Ok(ReportStatus::Resolved),
            other => Err(CoreError::Validation(format!(
                "Invalid report status '{other}'. Must be one of: pending, under_review, resolved"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportResolution {
    MarkResolved,
    WarnReported,
    WarnReporter,
    Dismiss,
}

/// All resolutions, in display order.
pub const ALL_RESOLUTIONS: &[ReportResolution] = &[
    ReportResolution::MarkResolved,
    ReportResolution::WarnReported,
    ReportResolution::WarnReporter,
    ReportResolution::Dismiss,
];

impl ReportResolution {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportResolution::MarkResolved => "mark_resolved",
            ReportResolution::WarnReported => "warn_reported",
            ReportResolution::WarnReporter => "warn_reporter",
            ReportResolution::Dismiss => "dismiss",
        }
    }

    pub fn parse(value: &str) -> CoreResult<Self> {
        ALL_RESOLUTIONS
            .iter()
            .copied()
            .find(|r| r.as_str() == value)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Invalid resolution '{value}'. Must be one of: mark_resolved, \
                     warn_reported, warn_reporter, dismiss"
                ))
            })
    }

    /// The fixed response recorded on the report for this resolution.
    pub fn admin_response(self) -> &'static str {
        match self {
            ReportResolution::MarkResolved => {
                "Your report has been reviewed and the issue has been marked as resolved."
            }
            ReportResolution::WarnReported => {
                "Your report has been reviewed and a warning has been issued to the reported user."
            }
            ReportResolution::WarnReporter => {
                "Your report has been reviewed and found to be in breach of community \
                 guidelines. A warning has been issued to your account."
            }
            ReportResolution::Dismiss => {
                "Your report has been reviewed and dismissed. No further action will be taken."
            }
        }
    }

    /// Which party, if any, receives a warning.
    pub fn warned_user(self, report: &Report) -> Option<UserId> {
        match self {
            ReportResolution::WarnReported => Some(report.reported_user),
            ReportResolution::WarnReporter => Some(report.reported_by),
            ReportResolution::MarkResolved | ReportResolution::Dismiss => None,
        }
    }
}

/// A moderation case opened by one session party against the other.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub id: ReportId,
    pub reported_by: UserId,
    pub reported_user: UserId,
    pub session_id: SessionId,
    pub reason: String,
    pub description: Option<String>,
    pub status: ReportStatus,
    pub resolution: Option<ReportResolution>,
    pub admin_response: Option<String>,
    pub admin_notes: Option<String>,
    pub reviewed_by: Option<UserId>,
    pub opened_at: Option<Timestamp>,
    pub resolved_by: Option<UserId>,
    pub resolved_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Input for filing a report.
#[derive(Debug, Clone, Deserialize)]
pub struct NewReport {
    pub reported_by: UserId,
    pub reported_user: UserId,
    pub session_id: SessionId,
    pub reason: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewReport {
    pub fn validate(&self) -> CoreResult<()> {
        require_id("reported_by", self.reported_by)?;
        require_id("reported_user", self.reported_user)?;
        require_id("session_id", self.session_id)?;
        validate_description("reason", &self.reason)?;
        if let Some(desc) = &self.description {
            validate_description("description", desc)?;
        }
        if self.reported_by == self.reported_user {
            return Err(CoreError::Validation("Users cannot report themselves".into()));
        }
        Ok(())
    }
}

pub fn validate_admin_notes(notes: &str) -> CoreResult<()> {
    if notes.chars().count() > MAX_ADMIN_NOTES_LENGTH {
        return Err(CoreError::Validation(format!(
            "admin_notes exceed maximum length of {MAX_ADMIN_NOTES_LENGTH} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn report() -> Report {
        Report {
            id: 1,
            reported_by: 10,
            reported_user: 20,
            session_id: 5,
            reason: "No-show".into(),
            description: None,
            status: ReportStatus::Pending,
            resolution: None,
            admin_response: None,
            admin_notes: None,
            reviewed_by: None,
            opened_at: None,
            resolved_by: None,
            resolved_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn every_resolution_has_distinct_response() {
        let mut responses: Vec<_> = ALL_RESOLUTIONS.iter().map(|r| r.admin_response()).collect();
        responses.sort();
        responses.dedup();
        assert_eq!(responses.len(), ALL_RESOLUTIONS.len());
    }

    #[test]
    fn resolution_parse() {
        for r in ALL_RESOLUTIONS {
            assert_eq!(ReportResolution::parse(r.as_str()).unwrap(), *r);
        }
        assert!(ReportResolution::parse("ban").is_err());
    }

    #[test]
    fn warned_user_by_resolution() {
        let r = report();
        assert_eq!(ReportResolution::WarnReported.warned_user(&r), Some(20));
        assert_eq!(ReportResolution::WarnReporter.warned_user(&r), Some(10));
        assert_eq!(ReportResolution::Dismiss.warned_user(&r), None);
    }

    #[test]
    fn self_report_rejected() {
        let input = NewReport {
            reported_by: 3,
            reported_user: 3,
            session_id: 1,
            reason: "spam".into(),
            description: None,
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn status_parse() {
        assert_eq!(
            ReportStatus::parse("under_review").unwrap(),
            ReportStatus::UnderReview
        );
        assert!(ReportStatus::parse("closed").is_err());
    }
}
