//! Repository for the `session_cancel_requests` table.

use async_trait::async_trait;
use skillswap_core::cancellation::{
    CancelResolution, CancelResponse, NewCancelRequest, SessionCancelRequest,
};
use skillswap_core::error::{CoreError, CoreResult};
use skillswap_core::repository::CancelRequestRepository;
use skillswap_core::session::{Session, SessionState};
use skillswap_core::types::{CancelRequestId, SessionId, UserId};

use crate::map_db_error;
use crate::models::cancellation::CancelRequestRow;
use crate::repositories::session_repo::transition_on;
use crate::DbPool;

/// Column list for `session_cancel_requests` queries.
const COLUMNS: &str = "\
    id, session_id, initiator_id, reason, description, evidence_files, \
    response_status, resolution, responded_at, resolved_at, resolved_by, \
    admin_notes, created_at, updated_at";

pub struct PgCancelRequestRepo {
    pool: DbPool,
}

impl PgCancelRequestRepo {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CancelRequestRepository for PgCancelRequestRepo {
    /// `uq_cancel_requests_open` allows one open request per session.
    async fn create(&self, input: &NewCancelRequest) -> CoreResult<SessionCancelRequest> {
        let query = format!(
            "INSERT INTO session_cancel_requests \
                (session_id, initiator_id, reason, description, evidence_files) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, CancelRequestRow>(&query)
            .bind(input.session_id)
            .bind(input.initiator_id)
            .bind(input.reason.trim())
            .bind(&input.description)
            .bind(&input.evidence_files)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match map_db_error(e) {
                CoreError::Conflict(_) => CoreError::Conflict(format!(
                    "Session {} already has an open cancellation request",
                    input.session_id
                )),
                other => other,
            })?;
        SessionCancelRequest::try_from(row)
    }

    async fn find_by_id(&self, id: CancelRequestId) -> CoreResult<Option<SessionCancelRequest>> {
        let query = format!("SELECT {COLUMNS} FROM session_cancel_requests WHERE id = $1");
        sqlx::query_as::<_, CancelRequestRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?
            .map(SessionCancelRequest::try_from)
            .transpose()
    }

    async fn list_for_session(
        &self,
        session_id: SessionId,
    ) -> CoreResult<Vec<SessionCancelRequest>> {
        let query = format!(
            "SELECT {COLUMNS} FROM session_cancel_requests \
             WHERE session_id = $1 ORDER BY created_at, id"
        );
        sqlx::query_as::<_, CancelRequestRow>(&query)
            .bind(session_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?
            .into_iter()
            .map(SessionCancelRequest::try_from)
            .collect()
    }

    /// Both updates commit together; if either precondition misses, the
    /// transaction rolls back and nothing changes.
    async fn record_response(
        &self,
        id: CancelRequestId,
        response: CancelResponse,
    ) -> CoreResult<Option<(SessionCancelRequest, Session)>> {
        let (response_status, resolution) = response.recorded_as();
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let query = format!(
            "UPDATE session_cancel_requests SET \
                response_status = $2, \
                resolution = $3, \
                responded_at = NOW(), \
                resolved_at = CASE WHEN $3::text = 'pending' THEN NULL ELSE NOW() END, \
                updated_at = NOW() \
             WHERE id = $1 AND response_status = 'pending' AND resolution = 'pending' \
             RETURNING {COLUMNS}"
        );
        let Some(row) = sqlx::query_as::<_, CancelRequestRow>(&query)
            .bind(id)
            .bind(response_status.as_str())
            .bind(resolution.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_db_error)?
        else {
            tx.rollback().await.map_err(map_db_error)?;
            return Ok(None);
        };
        let request = SessionCancelRequest::try_from(row)?;

        let target = response.session_outcome();
        let Some(session) =
            transition_on(&mut tx, request.session_id, SessionState::Active, target).await?
        else {
            tx.rollback().await.map_err(map_db_error)?;
            return Ok(None);
        };

        tx.commit().await.map_err(map_db_error)?;
        Ok(Some((request, session)))
    }

    async fn resolve_dispute(
        &self,
        id: CancelRequestId,
        resolution: CancelResolution,
        admin_id: UserId,
        admin_notes: Option<&str>,
    ) -> CoreResult<Option<(SessionCancelRequest, Session)>> {
        let target = resolution.session_outcome().ok_or_else(|| {
            CoreError::Validation("A dispute cannot be resolved to 'pending'".into())
        })?;
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let query = format!(
            "UPDATE session_cancel_requests SET \
                resolution = $2, \
                resolved_at = NOW(), \
                resolved_by = $3, \
                admin_notes = $4, \
                updated_at = NOW() \
             WHERE id = $1 AND response_status = 'disputed' AND resolution = 'pending' \
             RETURNING {COLUMNS}"
        );
        let Some(row) = sqlx::query_as::<_, CancelRequestRow>(&query)
            .bind(id)
            .bind(resolution.as_str())
            .bind(admin_id)
            .bind(admin_notes)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_db_error)?
        else {
            tx.rollback().await.map_err(map_db_error)?;
            return Ok(None);
        };
        let request = SessionCancelRequest::try_from(row)?;

        let Some(session) =
            transition_on(&mut tx, request.session_id, SessionState::Disputed, target).await?
        else {
            tx.rollback().await.map_err(map_db_error)?;
            return Ok(None);
        };

        tx.commit().await.map_err(map_db_error)?;
        Ok(Some((request, session)))
    }
}
