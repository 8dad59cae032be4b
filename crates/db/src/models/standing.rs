//! User standing rows (`user_standings`).

use skillswap_core::standing::UserStanding;
use skillswap_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `user_standings` table.
#[derive(Debug, Clone, FromRow)]
pub struct StandingRow {
    pub user_id: DbId,
    pub warning_count: i32,
    pub is_blocked: bool,
    pub suspended_until: Option<Timestamp>,
    pub suspension_reason: Option<String>,
    pub updated_at: Timestamp,
}

impl From<StandingRow> for UserStanding {
    fn from(row: StandingRow) -> Self {
        UserStanding {
            user_id: row.user_id,
            warning_count: row.warning_count,
            is_blocked: row.is_blocked,
            suspended_until: row.suspended_until,
            suspension_reason: row.suspension_reason,
            updated_at: row.updated_at,
        }
    }
}
