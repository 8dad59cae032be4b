//! Cancellation request rows (`session_cancel_requests`).

use skillswap_core::cancellation::{CancelResolution, CancelResponseStatus, SessionCancelRequest};
use skillswap_core::error::CoreError;
use skillswap_core::types::{DbId, Timestamp};
use sqlx::FromRow;

use crate::corrupt_column;

const TABLE: &str = "session_cancel_requests";

/// A row from the `session_cancel_requests` table.
#[derive(Debug, Clone, FromRow)]
pub struct CancelRequestRow {
    pub id: DbId,
    pub session_id: DbId,
    pub initiator_id: DbId,
    pub reason: String,
    pub description: Option<String>,
    pub evidence_files: Vec<String>,
    pub response_status: String,
    pub resolution: String,
    pub responded_at: Option<Timestamp>,
    pub resolved_at: Option<Timestamp>,
    pub resolved_by: Option<DbId>,
    pub admin_notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<CancelRequestRow> for SessionCancelRequest {
    type Error = CoreError;

    fn try_from(row: CancelRequestRow) -> Result<Self, Self::Error> {
        Ok(SessionCancelRequest {
            id: row.id,
            session_id: row.session_id,
            initiator_id: row.initiator_id,
            reason: row.reason,
            description: row.description,
            evidence_files: row.evidence_files,
            response_status: CancelResponseStatus::parse(&row.response_status)
                .map_err(|e| corrupt_column(TABLE, "response_status", e))?,
            resolution: CancelResolution::parse(&row.resolution)
                .map_err(|e| corrupt_column(TABLE, "resolution", e))?,
            responded_at: row.responded_at,
            resolved_at: row.resolved_at,
            resolved_by: row.resolved_by,
            admin_notes: row.admin_notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
