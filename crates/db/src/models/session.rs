//! Session rows (`sessions` table).

use skillswap_core::session::{Session, SessionState, StoredSessionState};
use skillswap_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `sessions` table.
#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub id: DbId,
    pub user1_id: DbId,
    pub skill1_id: DbId,
    pub description_of_service1: String,
    pub user2_id: DbId,
    pub skill2_id: DbId,
    pub description_of_service2: String,
    pub start_date: Timestamp,
    pub expected_end_date: Option<Timestamp>,
    pub is_accepted: Option<bool>,
    pub status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<SessionRow> for Session {
    /// Drifted rows are read through the repair rule and logged.
    fn from(row: SessionRow) -> Self {
        let state = SessionState::from_parts(row.is_accepted, &row.status).unwrap_or_else(|err| {
            let state = SessionState::reconcile(row.is_accepted, &row.status);
            tracing::warn!(
                session_id = row.id,
                is_accepted = ?row.is_accepted,
                stored_status = %row.status,
                read_as = %state.status(),
                error = %err,
                "Session row violates the acceptance/status invariant",
            );
            state
        });
        Session {
            id: row.id,
            user1_id: row.user1_id,
            skill1_id: row.skill1_id,
            description_of_service1: row.description_of_service1,
            user2_id: row.user2_id,
            skill2_id: row.skill2_id,
            description_of_service2: row.description_of_service2,
            start_date: row.start_date,
            expected_end_date: row.expected_end_date,
            state,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Just the columns the repair pass reads.
#[derive(Debug, Clone, FromRow)]
pub struct SessionStateRow {
    pub id: DbId,
    pub is_accepted: Option<bool>,
    pub status: String,
}

impl From<SessionStateRow> for StoredSessionState {
    fn from(row: SessionStateRow) -> Self {
        StoredSessionState {
            id: row.id,
            is_accepted: row.is_accepted,
            status: row.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(is_accepted: Option<bool>, status: &str) -> SessionRow {
        SessionRow {
            id: 1,
            user1_id: 1,
            skill1_id: 10,
            description_of_service1: "Piano".into(),
            user2_id: 2,
            skill2_id: 20,
            description_of_service2: "French".into(),
            start_date: Utc::now(),
            expected_end_date: None,
            is_accepted,
            status: status.into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn consistent_rows_map_directly() {
        assert_eq!(Session::from(row(None, "pending")).state, SessionState::Pending);
        assert_eq!(Session::from(row(Some(false), "canceled")).state, SessionState::Declined);
        assert_eq!(Session::from(row(Some(true), "canceled")).state, SessionState::Canceled);
        assert_eq!(Session::from(row(Some(true), "disputed")).state, SessionState::Disputed);
    }

    #[test]
    fn drifted_rows_are_reconciled() {
        assert_eq!(Session::from(row(None, "active")).state, SessionState::Pending);
        assert_eq!(Session::from(row(Some(true), "pending")).state, SessionState::Active);
        assert_eq!(Session::from(row(Some(false), "completed")).state, SessionState::Declined);
    }
}
