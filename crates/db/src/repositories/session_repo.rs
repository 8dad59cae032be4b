//! Repository for the `sessions` table.

use async_trait::async_trait;
use skillswap_core::error::CoreResult;
use skillswap_core::repository::SessionRepository;
use skillswap_core::session::{
    validate_transition, NewSession, Session, SessionState, SessionStatus, StoredSessionState,
};
use skillswap_core::types::{SessionId, UserId};
use sqlx::PgConnection;

use crate::map_db_error;
use crate::models::session::{SessionRow, SessionStateRow};
use crate::DbPool;

/// Column list for `sessions` queries.
const COLUMNS: &str = "\
    id, user1_id, skill1_id, description_of_service1, \
    user2_id, skill2_id, description_of_service2, \
    start_date, expected_end_date, is_accepted, status, created_at, updated_at";

pub struct PgSessionRepo {
    pool: DbPool,
}

impl PgSessionRepo {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepo {
    /// Count and insert under a transaction-scoped advisory lock keyed on the
    /// (proposer, receiver) pair, so concurrent proposals serialise.
    async fn create_within_limit(
        &self,
        input: &NewSession,
        limit: usize,
    ) -> CoreResult<Option<Session>> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        sqlx::query(
            "SELECT pg_advisory_xact_lock(hashtext($1::bigint::text || ':' || $2::bigint::text))",
        )
        .bind(input.user1_id)
        .bind(input.user2_id)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        let query = format!(
            "INSERT INTO sessions \
                (user1_id, skill1_id, description_of_service1, \
                 user2_id, skill2_id, description_of_service2, \
                 start_date, expected_end_date) \
             SELECT $1, $2, $3, $4, $5, $6, $7, $8 \
             WHERE (SELECT COUNT(*) FROM sessions \
                    WHERE user1_id = $1 AND user2_id = $4 \
                      AND is_accepted IS NULL AND status = 'pending') < $9 \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, SessionRow>(&query)
            .bind(input.user1_id)
            .bind(input.skill1_id)
            .bind(input.description_of_service1.trim())
            .bind(input.user2_id)
            .bind(input.skill2_id)
            .bind(input.description_of_service2.trim())
            .bind(input.start_date)
            .bind(input.expected_end_date)
            .bind(limit as i64)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(row.map(Session::from))
    }

    async fn find_by_id(&self, id: SessionId) -> CoreResult<Option<Session>> {
        let query = format!("SELECT {COLUMNS} FROM sessions WHERE id = $1");
        let row = sqlx::query_as::<_, SessionRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(row.map(Session::from))
    }

    /// Filters on the reconciled status, so drifted rows are listed where
    /// they will be read.
    async fn list_for_user(
        &self,
        user_id: UserId,
        status: Option<SessionStatus>,
    ) -> CoreResult<Vec<Session>> {
        let query = format!(
            "SELECT {COLUMNS} FROM sessions \
             WHERE user1_id = $1 OR user2_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, SessionRow>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(rows
            .into_iter()
            .map(Session::from)
            .filter(|s| status.map_or(true, |st| s.status() == st))
            .collect())
    }

    async fn transition(
        &self,
        id: SessionId,
        from: SessionState,
        to: SessionState,
    ) -> CoreResult<Option<Session>> {
        let mut conn = self.pool.acquire().await.map_err(map_db_error)?;
        transition_on(&mut conn, id, from, to).await
    }

    /// Each repaired row is rewritten only if it still holds the values that
    /// were read, so a concurrent transition is never overwritten.
    async fn repair_status_drift(&self) -> CoreResult<u64> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let rows = sqlx::query_as::<_, SessionStateRow>(
            "SELECT id, is_accepted, status FROM sessions ORDER BY id",
        )
        .fetch_all(&mut *tx)
        .await
        .map_err(map_db_error)?;

        let mut repaired = 0;
        for stored in rows.into_iter().map(StoredSessionState::from) {
            let Some(status) = stored.repaired_status() else {
                continue;
            };
            let result = sqlx::query(
                "UPDATE sessions SET status = $1, updated_at = NOW() \
                 WHERE id = $2 AND status = $3 AND is_accepted IS NOT DISTINCT FROM $4",
            )
            .bind(status.as_str())
            .bind(stored.id)
            .bind(&stored.status)
            .bind(stored.is_accepted)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

            if result.rows_affected() > 0 {
                tracing::debug!(
                    session_id = stored.id,
                    from = %stored.status,
                    to = %status,
                    "Repaired session status",
                );
                repaired += result.rows_affected();
            }
        }

        tx.commit().await.map_err(map_db_error)?;
        Ok(repaired)
    }
}

/// Conditional `from -> to` update on an existing connection, so callers can
/// pair it with other writes in one transaction.
pub(crate) async fn transition_on(
    conn: &mut PgConnection,
    id: SessionId,
    from: SessionState,
    to: SessionState,
) -> CoreResult<Option<Session>> {
    validate_transition(from, to)?;
    let query = format!(
        "UPDATE sessions SET is_accepted = $1, status = $2, updated_at = NOW() \
         WHERE id = $3 AND is_accepted IS NOT DISTINCT FROM $4 AND status = $5 \
         RETURNING {COLUMNS}"
    );
    let row = sqlx::query_as::<_, SessionRow>(&query)
        .bind(to.is_accepted())
        .bind(to.status().as_str())
        .bind(id)
        .bind(from.is_accepted())
        .bind(from.status().as_str())
        .fetch_optional(conn)
        .await
        .map_err(map_db_error)?;
    Ok(row.map(Session::from))
}
