//! User standing: moderation warnings, blocks, and suspensions.

use serde::Serialize;

use crate::error::{CoreError, CoreResult};
use crate::types::{Timestamp, UserId};

/// Longest suspension an admin may impose in one action (days).
pub const MAX_SUSPENSION_DAYS: i64 = 365;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserStanding {
    pub user_id: UserId,
    pub warning_count: i32,
    pub is_blocked: bool,
    pub suspended_until: Option<Timestamp>,
    pub suspension_reason: Option<String>,
    pub updated_at: Timestamp,
}

impl UserStanding {
    /// Standing of a user with no moderation history.
    pub fn clean(user_id: UserId, now: Timestamp) -> Self {
        Self {
            user_id,
            warning_count: 0,
            is_blocked: false,
            suspended_until: None,
            suspension_reason: None,
            updated_at: now,
        }
    }

    pub fn is_suspended(&self, now: Timestamp) -> bool {
        self.suspended_until.is_some_and(|until| until > now)
    }

    /// Whether the user may start new proposals.
    pub fn can_initiate(&self, now: Timestamp) -> bool {
        !self.is_blocked && !self.is_suspended(now)
    }

    /// Fail with `Forbidden` if the user may not start new proposals.
    pub fn ensure_can_initiate(&self, now: Timestamp) -> CoreResult<()> {
        if self.is_blocked {
            return Err(CoreError::Forbidden(format!(
                "User {} is blocked",
                self.user_id
            )));
        }
        if let Some(until) = self.suspended_until.filter(|until| *until > now) {
            return Err(CoreError::Forbidden(format!(
                "User {} is suspended until {}",
                self.user_id,
                until.to_rfc3339()
            )));
        }
        Ok(())
    }
}

/// Validate a suspension end date against the current time.
pub fn validate_suspension(until: Timestamp, now: Timestamp) -> CoreResult<()> {
    if until <= now {
        return Err(CoreError::Validation(
            "Suspension end must be in the future".into(),
        ));
    }
    if until - now > chrono::Duration::days(MAX_SUSPENSION_DAYS) {
        return Err(CoreError::Validation(format!(
            "Suspensions may last at most {MAX_SUSPENSION_DAYS} days"
        )));
    }
    Ok(())
}
