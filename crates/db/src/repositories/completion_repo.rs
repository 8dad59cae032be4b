//! Repository for the `session_completion_requests` table.

use async_trait::async_trait;
use skillswap_core::completion::{CompletionDecision, CompletionRequest, RequestForUser};
use skillswap_core::error::{CoreError, CoreResult};
use skillswap_core::repository::CompletionRepository;
use skillswap_core::types::{CompletionRequestId, SessionId, UserId};

use crate::map_db_error;
use crate::models::completion::CompletionRequestRow;
use crate::DbPool;

/// Column list for `session_completion_requests` queries.
const COLUMNS: &str = "\
    id, session_id, requested_by, request_for_user, status, \
    approved_at, approved_by, rejection_reason, created_at, updated_at";

pub struct PgCompletionRepo {
    pool: DbPool,
}

impl PgCompletionRepo {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CompletionRepository for PgCompletionRepo {
    /// `uq_completion_requests_pending` rejects a second pending request from
    /// the same user.
    async fn create_pending(
        &self,
        session_id: SessionId,
        requested_by: UserId,
        request_for_user: RequestForUser,
    ) -> CoreResult<CompletionRequest> {
        let query = format!(
            "INSERT INTO session_completion_requests \
                (session_id, requested_by, request_for_user) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, CompletionRequestRow>(&query)
            .bind(session_id)
            .bind(requested_by)
            .bind(request_for_user.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match map_db_error(e) {
                CoreError::Conflict(_) => CoreError::Conflict(format!(
                    "User {requested_by} already has a pending completion request for session {session_id}"
                )),
                other => other,
            })?;
        CompletionRequest::try_from(row)
    }

    async fn find_by_id(&self, id: CompletionRequestId) -> CoreResult<Option<CompletionRequest>> {
        let query = format!("SELECT {COLUMNS} FROM session_completion_requests WHERE id = $1");
        sqlx::query_as::<_, CompletionRequestRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?
            .map(CompletionRequest::try_from)
            .transpose()
    }

    async fn list_for_session(&self, session_id: SessionId) -> CoreResult<Vec<CompletionRequest>> {
        let query = format!(
            "SELECT {COLUMNS} FROM session_completion_requests \
             WHERE session_id = $1 ORDER BY created_at, id"
        );
        sqlx::query_as::<_, CompletionRequestRow>(&query)
            .bind(session_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?
            .into_iter()
            .map(CompletionRequest::try_from)
            .collect()
    }

    async fn resolve(
        &self,
        id: CompletionRequestId,
        decision: &CompletionDecision,
        decided_by: UserId,
    ) -> CoreResult<Option<CompletionRequest>> {
        let query = match decision {
            CompletionDecision::Approve => format!(
                "UPDATE session_completion_requests \
                 SET status = $2, approved_at = NOW(), approved_by = $3, updated_at = NOW() \
                 WHERE id = $1 AND status = 'pending' \
                 RETURNING {COLUMNS}"
            ),
            CompletionDecision::Reject { .. } => format!(
                "UPDATE session_completion_requests \
                 SET status = $2, rejection_reason = $3, updated_at = NOW() \
                 WHERE id = $1 AND status = 'pending' \
                 RETURNING {COLUMNS}"
            ),
        };
        let q = sqlx::query_as::<_, CompletionRequestRow>(&query)
            .bind(id)
            .bind(decision.target_status().as_str());
        let q = match decision {
            CompletionDecision::Approve => q.bind(decided_by),
            CompletionDecision::Reject { reason } => q.bind(reason.as_str()),
        };
        q.fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?
            .map(CompletionRequest::try_from)
            .transpose()
    }
}
