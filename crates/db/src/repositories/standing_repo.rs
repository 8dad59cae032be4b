//! Repository for the `user_standings` table.
//!
//! Every write is an upsert: a user without a row has a clean standing.

use async_trait::async_trait;
use skillswap_core::error::CoreResult;
use skillswap_core::repository::StandingRepository;
use skillswap_core::standing::UserStanding;
use skillswap_core::types::{Timestamp, UserId};

use crate::map_db_error;
use crate::models::standing::StandingRow;
use crate::DbPool;

/// Column list for `user_standings` queries.
const COLUMNS: &str =
    "user_id, warning_count, is_blocked, suspended_until, suspension_reason, updated_at";

pub struct PgStandingRepo {
    pool: DbPool,
}

impl PgStandingRepo {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StandingRepository for PgStandingRepo {
    async fn find(&self, user_id: UserId) -> CoreResult<Option<UserStanding>> {
        let query = format!("SELECT {COLUMNS} FROM user_standings WHERE user_id = $1");
        let row = sqlx::query_as::<_, StandingRow>(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(row.map(UserStanding::from))
    }

    async fn add_warning(&self, user_id: UserId) -> CoreResult<UserStanding> {
        let query = format!(
            "INSERT INTO user_standings (user_id, warning_count) VALUES ($1, 1) \
             ON CONFLICT (user_id) DO UPDATE SET \
                warning_count = user_standings.warning_count + 1, \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, StandingRow>(&query)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(row.into())
    }

    async fn set_blocked(&self, user_id: UserId, blocked: bool) -> CoreResult<UserStanding> {
        let query = format!(
            "INSERT INTO user_standings (user_id, is_blocked) VALUES ($1, $2) \
             ON CONFLICT (user_id) DO UPDATE SET \
                is_blocked = EXCLUDED.is_blocked, \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, StandingRow>(&query)
            .bind(user_id)
            .bind(blocked)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(row.into())
    }

    async fn set_suspension(
        &self,
        user_id: UserId,
        until: Option<Timestamp>,
        reason: Option<&str>,
    ) -> CoreResult<UserStanding> {
        let query = format!(
            "INSERT INTO user_standings (user_id, suspended_until, suspension_reason) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (user_id) DO UPDATE SET \
                suspended_until = EXCLUDED.suspended_until, \
                suspension_reason = EXCLUDED.suspension_reason, \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, StandingRow>(&query)
            .bind(user_id)
            .bind(until)
            .bind(reason)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(row.into())
    }
}
