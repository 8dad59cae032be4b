//! Identifier and reference types shared by every layer.
//!
//! Identifiers are opaque to the domain: they are never parsed or compared
//! beyond equality, and the referenced user/skill records live in external
//! collaborators.

use serde::{Deserialize, Serialize};

/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

pub type UserId = DbId;
pub type SkillId = DbId;
pub type SessionId = DbId;
pub type MeetingId = DbId;
pub type ReportId = DbId;
pub type CompletionRequestId = DbId;
pub type CancelRequestId = DbId;

/// The caller on whose behalf a command runs.
///
/// Authentication happens upstream; the domain only authorises on the
/// user id and the admin flag carried here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub is_admin: bool,
}

impl Actor {
    /// A regular (non-admin) user.
    pub fn user(user_id: UserId) -> Self {
        Self {
            user_id,
            is_admin: false,
        }
    }

    /// A user holding the admin role.
    pub fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            is_admin: true,
        }
    }
}
