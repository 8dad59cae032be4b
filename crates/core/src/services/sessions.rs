//! Session state machine commands: propose, accept, reject, repair.

use std::sync::Arc;

use serde_json::json;

use super::{load_session, require_admin, require_party_or_admin};
use crate::error::{CoreError, CoreResult};
use crate::events::{entity_types, event_types, LifecycleEvent, NotificationSink};
use crate::repository::SessionRepository;
use crate::session::{
    NewSession, Session, SessionState, SessionStatus, MAX_PENDING_PROPOSALS_PER_PAIR,
};
use crate::types::{Actor, SessionId, UserId};

#[derive(Clone)]
pub struct SessionService {
    sessions: Arc<dyn SessionRepository>,
    sink: Arc<dyn NotificationSink>,
}

impl SessionService {
    pub fn new(sessions: Arc<dyn SessionRepository>, sink: Arc<dyn NotificationSink>) -> Self {
        Self { sessions, sink }
    }

    /// Create a pending session proposed by `input.user1_id`.
    ///
    /// Fails with `CapacityExceeded` when the proposer already has
    /// [`MAX_PENDING_PROPOSALS_PER_PAIR`] pending proposals to the receiver.
    pub async fn propose_session(&self, input: &NewSession) -> CoreResult<Session> {
        input.validate()?;

        let session = self
            .sessions
            .create_within_limit(input, MAX_PENDING_PROPOSALS_PER_PAIR)
            .await?
            .ok_or_else(|| {
                CoreError::CapacityExceeded(format!(
                    "User {} already has {MAX_PENDING_PROPOSALS_PER_PAIR} pending proposals to user {}",
                    input.user1_id, input.user2_id
                ))
            })?;

        tracing::info!(
            session_id = session.id,
            user1_id = session.user1_id,
            user2_id = session.user2_id,
            "Session proposed",
        );
        self.sink.notify(
            LifecycleEvent::new(
                event_types::SESSION_PROPOSED,
                entity_types::SESSION,
                session.id,
                session.user1_id,
            )
            .notify(session.user2_id)
            .with_payload(json!({
                "skill1_id": session.skill1_id,
                "skill2_id": session.skill2_id,
                "start_date": session.start_date,
            })),
        );
        Ok(session)
    }

    /// Fetch a session visible to the actor.
    pub async fn get_session(&self, id: SessionId, actor: Actor) -> CoreResult<Session> {
        let session = load_session(self.sessions.as_ref(), id).await?;
        require_party_or_admin(&session, actor)?;
        Ok(session)
    }

    pub async fn list_sessions(
        &self,
        user_id: UserId,
        status: Option<SessionStatus>,
    ) -> CoreResult<Vec<Session>> {
        self.sessions.list_for_user(user_id, status).await
    }

    /// The receiver accepts a pending proposal.
    pub async fn accept_session(&self, id: SessionId, by: UserId) -> CoreResult<Session> {
        let session = load_session(self.sessions.as_ref(), id).await?;
        require_receiver(&session, by, "accept")?;

        if session.state != SessionState::Pending {
            return Err(CoreError::Conflict(format!(
                "Session {id} has already been decided (status '{}')",
                session.status()
            )));
        }

        let accepted = self
            .sessions
            .transition(id, SessionState::Pending, SessionState::Active)
            .await?
            .ok_or_else(|| {
                CoreError::Conflict(format!("Session {id} was decided by another request"))
            })?;

        tracing::info!(session_id = id, user_id = by, "Session accepted");
        self.sink.notify(
            LifecycleEvent::new(
                event_types::SESSION_ACCEPTED,
                entity_types::SESSION,
                id,
                by,
            )
            .notify(accepted.user1_id),
        );
        Ok(accepted)
    }

    /// The receiver rejects a pending proposal.
    ///
    /// Rejecting an already-rejected session succeeds without writing.
    pub async fn reject_session(&self, id: SessionId, by: UserId) -> CoreResult<Session> {
        let session = load_session(self.sessions.as_ref(), id).await?;
        require_receiver(&session, by, "reject")?;

        match session.state {
            SessionState::Declined => {
                tracing::debug!(session_id = id, "Session already rejected");
                return Ok(session);
            }
            SessionState::Pending => {}
            _ => {
                return Err(CoreError::Conflict(format!(
                    "Session {id} has already been decided (status '{}')",
                    session.status()
                )))
            }
        }

        let rejected = match self
            .sessions
            .transition(id, SessionState::Pending, SessionState::Declined)
            .await?
        {
            Some(rejected) => rejected,
            None => {
                // Lost a race; fine if the winner also rejected.
                let current = load_session(self.sessions.as_ref(), id).await?;
                if current.state == SessionState::Declined {
                    return Ok(current);
                }
                return Err(CoreError::Conflict(format!(
                    "Session {id} was decided by another request"
                )));
            }
        };

        tracing::info!(session_id = id, user_id = by, "Session rejected");
        self.sink.notify(
            LifecycleEvent::new(
                event_types::SESSION_REJECTED,
                entity_types::SESSION,
                id,
                by,
            )
            .notify(rejected.user1_id),
        );
        Ok(rejected)
    }

    /// Recompute every stored status from its acceptance flag.
    ///
    /// Safe to re-run: a second pass over repaired data changes nothing.
    pub async fn fix_status_consistency(&self, actor: Actor) -> CoreResult<u64> {
        require_admin(actor, "repair session statuses")?;
        let repaired = self.sessions.repair_status_drift().await?;
        if repaired > 0 {
            tracing::warn!(repaired, admin_id = actor.user_id, "Repaired drifted session statuses");
        } else {
            tracing::info!(admin_id = actor.user_id, "Session statuses already consistent");
        }
        Ok(repaired)
    }
}

/// Only the receiving party (`user2`) may decide on a proposal.
fn require_receiver(session: &Session, by: UserId, verb: &str) -> CoreResult<()> {
    if by == session.user1_id {
        return Err(CoreError::Forbidden(format!(
            "The proposer cannot {verb} their own proposal"
        )));
    }
    if by != session.user2_id {
        return Err(CoreError::Forbidden(format!(
            "Only the receiving party may {verb} session {}",
            session.id
        )));
    }
    Ok(())
}
