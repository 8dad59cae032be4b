//! Admin moderation of user standing: blocks and suspensions.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use super::require_admin;
use crate::error::{CoreError, CoreResult};
use crate::events::{entity_types, event_types, LifecycleEvent, NotificationSink};
use crate::repository::StandingRepository;
use crate::session::validate_description;
use crate::standing::{validate_suspension, UserStanding};
use crate::types::{Actor, Timestamp, UserId};

#[derive(Clone)]
pub struct StandingService {
    standings: Arc<dyn StandingRepository>,
    sink: Arc<dyn NotificationSink>,
}

impl StandingService {
    pub fn new(standings: Arc<dyn StandingRepository>, sink: Arc<dyn NotificationSink>) -> Self {
        Self { standings, sink }
    }

    /// Current standing; users without a moderation history are clean.
    pub async fn get_standing(&self, user_id: UserId) -> CoreResult<UserStanding> {
        Ok(self
            .standings
            .find(user_id)
            .await?
            .unwrap_or_else(|| UserStanding::clean(user_id, Utc::now())))
    }

    /// Fail with `Forbidden` if the user is blocked or suspended.
    pub async fn ensure_can_initiate(&self, user_id: UserId) -> CoreResult<()> {
        self.get_standing(user_id)
            .await?
            .ensure_can_initiate(Utc::now())
    }

    pub async fn block_user(&self, actor: Actor, user_id: UserId) -> CoreResult<UserStanding> {
        require_admin(actor, "block users")?;
        if actor.user_id == user_id {
            return Err(CoreError::Validation("Admins cannot block themselves".into()));
        }
        let standing = self.standings.set_blocked(user_id, true).await?;
        tracing::warn!(user_id, admin_id = actor.user_id, "User blocked");
        self.emit(event_types::USER_BLOCKED, actor, user_id, json!({}));
        Ok(standing)
    }

    pub async fn unblock_user(&self, actor: Actor, user_id: UserId) -> CoreResult<UserStanding> {
        require_admin(actor, "unblock users")?;
        let standing = self.standings.set_blocked(user_id, false).await?;
        tracing::info!(user_id, admin_id = actor.user_id, "User unblocked");
        self.emit(event_types::USER_UNBLOCKED, actor, user_id, json!({}));
        Ok(standing)
    }

    pub async fn suspend_user(
        &self,
        actor: Actor,
        user_id: UserId,
        until: Timestamp,
        reason: &str,
    ) -> CoreResult<UserStanding> {
        require_admin(actor, "suspend users")?;
        if actor.user_id == user_id {
            return Err(CoreError::Validation("Admins cannot suspend themselves".into()));
        }
        validate_suspension(until, Utc::now())?;
        validate_description("reason", reason)?;

        let standing = self
            .standings
            .set_suspension(user_id, Some(until), Some(reason.trim()))
            .await?;
        tracing::warn!(
            user_id,
            admin_id = actor.user_id,
            until = %until.to_rfc3339(),
            "User suspended",
        );
        self.emit(
            event_types::USER_SUSPENDED,
            actor,
            user_id,
            json!({ "until": until, "reason": reason.trim() }),
        );
        Ok(standing)
    }

    pub async fn lift_suspension(&self, actor: Actor, user_id: UserId) -> CoreResult<UserStanding> {
        require_admin(actor, "lift suspensions")?;
        let standing = self.standings.set_suspension(user_id, None, None).await?;
        tracing::info!(user_id, admin_id = actor.user_id, "Suspension lifted");
        self.emit(event_types::USER_SUSPENSION_LIFTED, actor, user_id, json!({}));
        Ok(standing)
    }

    fn emit(&self, event_type: &'static str, actor: Actor, user_id: UserId, payload: serde_json::Value) {
        self.sink.notify(
            LifecycleEvent::new(event_type, entity_types::USER, user_id, actor.user_id)
                .notify(user_id)
                .with_payload(payload),
        );
    }
}
