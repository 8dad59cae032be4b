//! Repository for the `platform_events` table.

use sqlx::PgPool;
use skillswap_core::types::{DbId, UserId};

/// Appends lifecycle events to the `platform_events` audit table.
pub struct EventRepo;

impl EventRepo {
    /// Insert a new event row, returning the generated ID.
    pub async fn insert(
        pool: &PgPool,
        event_type: &str,
        entity_type: &str,
        entity_id: DbId,
        actor_user_id: UserId,
        recipients: &[UserId],
        payload: &serde_json::Value,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO platform_events \
                (event_type, entity_type, entity_id, actor_user_id, recipients, payload) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id",
        )
        .bind(event_type)
        .bind(entity_type)
        .bind(entity_id)
        .bind(actor_user_id)
        .bind(recipients)
        .bind(payload)
        .fetch_one(pool)
        .await
    }
}
