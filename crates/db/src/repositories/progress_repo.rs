//! Repository for the `session_progress` table.

use async_trait::async_trait;
use skillswap_core::completion::{ProgressUpdate, SessionProgress};
use skillswap_core::error::CoreResult;
use skillswap_core::repository::ProgressRepository;
use skillswap_core::types::SessionId;

use crate::map_db_error;
use crate::models::completion::ProgressRow;
use crate::DbPool;

/// Column list for `session_progress` queries.
const COLUMNS: &str = "session_id, user_id, completion_percentage, status, notes, updated_at";

pub struct PgProgressRepo {
    pool: DbPool,
}

impl PgProgressRepo {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProgressRepository for PgProgressRepo {
    async fn upsert(&self, update: &ProgressUpdate) -> CoreResult<SessionProgress> {
        let query = format!(
            "INSERT INTO session_progress \
                (session_id, user_id, completion_percentage, status, notes) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (session_id, user_id) DO UPDATE SET \
                completion_percentage = EXCLUDED.completion_percentage, \
                status = EXCLUDED.status, \
                notes = EXCLUDED.notes, \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, ProgressRow>(&query)
            .bind(update.session_id)
            .bind(update.user_id)
            .bind(update.completion_percentage)
            .bind(update.status.as_str())
            .bind(&update.notes)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;
        SessionProgress::try_from(row)
    }

    async fn list_for_session(&self, session_id: SessionId) -> CoreResult<Vec<SessionProgress>> {
        let query = format!(
            "SELECT {COLUMNS} FROM session_progress WHERE session_id = $1 ORDER BY user_id"
        );
        sqlx::query_as::<_, ProgressRow>(&query)
            .bind(session_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?
            .into_iter()
            .map(SessionProgress::try_from)
            .collect()
    }
}
