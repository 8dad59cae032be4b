//! Two-sided completion handshake and per-user progress.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use super::{load_session, require_party_or_admin};
use crate::completion::{
    both_sides_approved, clamp_percentage, validate_notes, CompletionDecision, CompletionRequest,
    CompletionStatus, ProgressStatus, ProgressUpdate, RequestForUser, SessionProgress,
};
use crate::error::{CoreError, CoreResult};
use crate::events::{entity_types, event_types, LifecycleEvent, NotificationSink};
use crate::repository::{CompletionRepository, ProgressRepository, SessionRepository};
use crate::session::{Session, SessionState};
use crate::types::{Actor, CompletionRequestId, SessionId, UserId};

/// Result of resolving a completion request: the request as decided and the
/// session as it stands afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionOutcome {
    pub request: CompletionRequest,
    pub session: Session,
}

#[derive(Clone)]
pub struct CompletionTracker {
    sessions: Arc<dyn SessionRepository>,
    completions: Arc<dyn CompletionRepository>,
    progress: Arc<dyn ProgressRepository>,
    sink: Arc<dyn NotificationSink>,
}

impl CompletionTracker {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        completions: Arc<dyn CompletionRepository>,
        progress: Arc<dyn ProgressRepository>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            sessions,
            completions,
            progress,
            sink,
        }
    }

    // -----------------------------------------------------------------------
    // Completion requests
    // -----------------------------------------------------------------------

    /// File a completion request for the actor's side of an active session.
    ///
    /// Admins who are not a party file on behalf of both sides.
    pub async fn request_completion(
        &self,
        session_id: SessionId,
        actor: Actor,
    ) -> CoreResult<CompletionRequest> {
        let session = load_session(self.sessions.as_ref(), session_id).await?;

        let request_for = match session.side_of(actor.user_id) {
            Some(side) => RequestForUser::from(side),
            None if actor.is_admin => RequestForUser::Both,
            None => {
                return Err(CoreError::Forbidden(format!(
                    "User {} is not a party to session {session_id}",
                    actor.user_id
                )))
            }
        };

        if session.state != SessionState::Active {
            return Err(CoreError::Conflict(format!(
                "Session {session_id} must be active to request completion (status '{}')",
                session.status()
            )));
        }

        let existing = self.completions.list_for_session(session_id).await?;
        let already_approved = existing.iter().any(|r| {
            r.status == CompletionStatus::Approved
                && match request_for {
                    RequestForUser::Both => r.request_for_user == RequestForUser::Both,
                    side => r.request_for_user == side || r.request_for_user == RequestForUser::Both,
                }
        });
        if already_approved {
            return Err(CoreError::Conflict(format!(
                "Completion for {} on session {session_id} is already approved",
                request_for.as_str()
            )));
        }

        let request = self
            .completions
            .create_pending(session_id, actor.user_id, request_for)
            .await?;

        tracing::info!(
            session_id,
            request_id = request.id,
            requested_by = actor.user_id,
            request_for_user = request_for.as_str(),
            "Completion requested",
        );

        let mut event = LifecycleEvent::new(
            event_types::COMPLETION_REQUESTED,
            entity_types::COMPLETION_REQUEST,
            request.id,
            actor.user_id,
        )
        .with_payload(json!({
            "session_id": session_id,
            "request_for_user": request_for.as_str(),
        }));
        for user in [session.user1_id, session.user2_id] {
            if user != actor.user_id {
                event = event.notify(user);
            }
        }
        self.sink.notify(event);

        Ok(request)
    }

    /// Approve or reject a pending completion request.
    ///
    /// The requester's counterparty decides (or an admin). Approval of the
    /// last uncovered side moves the session from active to completed.
    pub async fn resolve_completion_request(
        &self,
        request_id: CompletionRequestId,
        decision: CompletionDecision,
        actor: Actor,
    ) -> CoreResult<CompletionOutcome> {
        let request = self
            .completions
            .find_by_id(request_id)
            .await?
            .ok_or(CoreError::not_found("CompletionRequest", request_id))?;
        let session = load_session(self.sessions.as_ref(), request.session_id).await?;

        if !actor.is_admin {
            if actor.user_id == request.requested_by {
                return Err(CoreError::Forbidden(
                    "A completion request cannot be resolved by its requester".into(),
                ));
            }
            require_party_or_admin(&session, actor)?;
        }

        if request.status != CompletionStatus::Pending {
            return Err(CoreError::Conflict(format!(
                "Completion request {request_id} is already {}",
                request.status.as_str()
            )));
        }
        if session.state != SessionState::Active {
            return Err(CoreError::Conflict(format!(
                "Session {} is no longer active (status '{}')",
                session.id,
                session.status()
            )));
        }

        let resolved = self
            .completions
            .resolve(request_id, &decision, actor.user_id)
            .await?
            .ok_or_else(|| {
                CoreError::Conflict(format!(
                    "Completion request {request_id} was resolved by another request"
                ))
            })?;

        tracing::info!(
            request_id,
            session_id = session.id,
            decided_by = actor.user_id,
            status = resolved.status.as_str(),
            "Completion request resolved",
        );

        let event_type = match decision {
            CompletionDecision::Approve => event_types::COMPLETION_APPROVED,
            CompletionDecision::Reject { .. } => event_types::COMPLETION_REJECTED,
        };
        self.sink.notify(
            LifecycleEvent::new(
                event_type,
                entity_types::COMPLETION_REQUEST,
                request_id,
                actor.user_id,
            )
            .notify(resolved.requested_by)
            .with_payload(json!({
                "session_id": session.id,
                "rejection_reason": resolved.rejection_reason,
            })),
        );

        let session = match decision {
            CompletionDecision::Approve => self.complete_if_both_approved(session, actor).await?,
            CompletionDecision::Reject { .. } => session,
        };

        Ok(CompletionOutcome {
            request: resolved,
            session,
        })
    }

    async fn complete_if_both_approved(&self, session: Session, actor: Actor) -> CoreResult<Session> {
        let requests = self.completions.list_for_session(session.id).await?;
        if !both_sides_approved(&requests) {
            return Ok(session);
        }

        match self
            .sessions
            .transition(session.id, SessionState::Active, SessionState::Completed)
            .await?
        {
            Some(completed) => {
                tracing::info!(session_id = completed.id, "Session completed");
                self.sink.notify(
                    LifecycleEvent::new(
                        event_types::SESSION_COMPLETED,
                        entity_types::SESSION,
                        completed.id,
                        actor.user_id,
                    )
                    .notify(completed.user1_id)
                    .notify(completed.user2_id),
                );
                Ok(completed)
            }
            // A concurrent approval already completed it.
            None => load_session(self.sessions.as_ref(), session.id).await,
        }
    }

    pub async fn list_completion_requests(
        &self,
        session_id: SessionId,
        actor: Actor,
    ) -> CoreResult<Vec<CompletionRequest>> {
        let session = load_session(self.sessions.as_ref(), session_id).await?;
        require_party_or_admin(&session, actor)?;
        self.completions.list_for_session(session_id).await
    }

    // -----------------------------------------------------------------------
    // Progress
    // -----------------------------------------------------------------------

    /// Record a user's self-reported progress on a session.
    ///
    /// The percentage is clamped into `0..=100`; when no status is given it
    /// is derived from the percentage. Never changes the session status.
    pub async fn update_progress(
        &self,
        actor: Actor,
        session_id: SessionId,
        user_id: UserId,
        completion_percentage: i32,
        status: Option<ProgressStatus>,
        notes: Option<String>,
    ) -> CoreResult<SessionProgress> {
        if actor.user_id != user_id && !actor.is_admin {
            return Err(CoreError::Forbidden(
                "Progress can only be updated by the user it belongs to".into(),
            ));
        }
        if let Some(notes) = &notes {
            validate_notes(notes)?;
        }

        let session = load_session(self.sessions.as_ref(), session_id).await?;
        if !session.is_party(user_id) {
            return Err(CoreError::Forbidden(format!(
                "User {user_id} is not a party to session {session_id}"
            )));
        }
        if !matches!(session.state, SessionState::Active | SessionState::Disputed) {
            return Err(CoreError::Conflict(format!(
                "Progress cannot be tracked on a session with status '{}'",
                session.status()
            )));
        }

        let completion_percentage = clamp_percentage(completion_percentage);
        let update = ProgressUpdate {
            session_id,
            user_id,
            completion_percentage,
            status: status.unwrap_or_else(|| ProgressStatus::from_percentage(completion_percentage)),
            notes,
        };
        let progress = self.progress.upsert(&update).await?;

        tracing::debug!(
            session_id,
            user_id,
            completion_percentage,
            status = progress.status.as_str(),
            "Progress updated",
        );
        Ok(progress)
    }

    pub async fn list_progress(
        &self,
        session_id: SessionId,
        actor: Actor,
    ) -> CoreResult<Vec<SessionProgress>> {
        let session = load_session(self.sessions.as_ref(), session_id).await?;
        require_party_or_admin(&session, actor)?;
        self.progress.list_for_session(session_id).await
    }
}
