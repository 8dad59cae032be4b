//! Completion request rows (`session_completion_requests`) and progress rows
//! (`session_progress`).

use skillswap_core::completion::{
    CompletionRequest, CompletionStatus, ProgressStatus, RequestForUser, SessionProgress,
};
use skillswap_core::error::CoreError;
use skillswap_core::types::{DbId, Timestamp};
use sqlx::FromRow;

use crate::corrupt_column;

const REQUESTS_TABLE: &str = "session_completion_requests";

/// A row from the `session_completion_requests` table.
#[derive(Debug, Clone, FromRow)]
pub struct CompletionRequestRow {
    pub id: DbId,
    pub session_id: DbId,
    pub requested_by: DbId,
    pub request_for_user: String,
    pub status: String,
    pub approved_at: Option<Timestamp>,
    pub approved_by: Option<DbId>,
    pub rejection_reason: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<CompletionRequestRow> for CompletionRequest {
    type Error = CoreError;

    fn try_from(row: CompletionRequestRow) -> Result<Self, Self::Error> {
        Ok(CompletionRequest {
            id: row.id,
            session_id: row.session_id,
            requested_by: row.requested_by,
            request_for_user: RequestForUser::parse(&row.request_for_user)
                .map_err(|e| corrupt_column(REQUESTS_TABLE, "request_for_user", e))?,
            status: CompletionStatus::parse(&row.status)
                .map_err(|e| corrupt_column(REQUESTS_TABLE, "status", e))?,
            approved_at: row.approved_at,
            approved_by: row.approved_by,
            rejection_reason: row.rejection_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// A row from the `session_progress` table.
#[derive(Debug, Clone, FromRow)]
pub struct ProgressRow {
    pub session_id: DbId,
    pub user_id: DbId,
    pub completion_percentage: i16,
    pub status: String,
    pub notes: Option<String>,
    pub updated_at: Timestamp,
}

impl TryFrom<ProgressRow> for SessionProgress {
    type Error = CoreError;

    fn try_from(row: ProgressRow) -> Result<Self, Self::Error> {
        Ok(SessionProgress {
            session_id: row.session_id,
            user_id: row.user_id,
            completion_percentage: row.completion_percentage,
            status: ProgressStatus::parse(&row.status)
                .map_err(|e| corrupt_column("session_progress", "status", e))?,
            notes: row.notes,
            updated_at: row.updated_at,
        })
    }
}
