//! Session cancellation requests and admin dispute resolution.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use super::{load_session, require_admin, require_party_or_admin};
use crate::cancellation::{
    CancelResolution, CancelResponse, CancelResponseStatus, NewCancelRequest,
    SessionCancelRequest,
};
use crate::error::{CoreError, CoreResult};
use crate::events::{entity_types, event_types, LifecycleEvent, NotificationSink};
use crate::report::validate_admin_notes;
use crate::repository::{CancelRequestRepository, SessionRepository};
use crate::session::{Session, SessionState};
use crate::types::{Actor, CancelRequestId, SessionId, UserId};

/// A cancellation request together with the session it acted on.
#[derive(Debug, Clone, Serialize)]
pub struct CancellationOutcome {
    pub request: SessionCancelRequest,
    pub session: Session,
}

#[derive(Clone)]
pub struct CancellationService {
    sessions: Arc<dyn SessionRepository>,
    cancellations: Arc<dyn CancelRequestRepository>,
    sink: Arc<dyn NotificationSink>,
}

impl CancellationService {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        cancellations: Arc<dyn CancelRequestRepository>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            sessions,
            cancellations,
            sink,
        }
    }

    /// A party asks to cancel an active session.
    pub async fn request_cancellation(
        &self,
        input: &NewCancelRequest,
    ) -> CoreResult<SessionCancelRequest> {
        input.validate()?;
        let session = load_session(self.sessions.as_ref(), input.session_id).await?;
        let counterparty = session.counterparty(input.initiator_id).ok_or_else(|| {
            CoreError::Forbidden(format!(
                "User {} is not a party to session {}",
                input.initiator_id, session.id
            ))
        })?;
        if session.state != SessionState::Active {
            return Err(CoreError::Conflict(format!(
                "Only active sessions can be canceled (status '{}')",
                session.status()
            )));
        }

        let request = self.cancellations.create(input).await?;

        tracing::info!(
            session_id = session.id,
            request_id = request.id,
            initiator_id = input.initiator_id,
            "Cancellation requested",
        );
        self.sink.notify(
            LifecycleEvent::new(
                event_types::CANCELLATION_REQUESTED,
                entity_types::CANCEL_REQUEST,
                request.id,
                input.initiator_id,
            )
            .notify(counterparty)
            .with_payload(json!({ "session_id": session.id, "reason": request.reason })),
        );
        Ok(request)
    }

    /// The counterparty agrees (session canceled) or disputes (session
    /// disputed, awaiting an admin).
    pub async fn respond_cancellation(
        &self,
        request_id: CancelRequestId,
        by: UserId,
        response: CancelResponse,
    ) -> CoreResult<CancellationOutcome> {
        let request = self.load_request(request_id).await?;
        let session = load_session(self.sessions.as_ref(), request.session_id).await?;

        if by == request.initiator_id {
            return Err(CoreError::Forbidden(
                "The initiator cannot respond to their own cancellation request".into(),
            ));
        }
        if !session.is_party(by) {
            return Err(CoreError::Forbidden(format!(
                "User {by} is not a party to session {}",
                session.id
            )));
        }
        if request.response_status != CancelResponseStatus::Pending || !request.is_open() {
            return Err(CoreError::Conflict(format!(
                "Cancellation request {request_id} has already been answered"
            )));
        }
        if session.state != SessionState::Active {
            return Err(CoreError::Conflict(format!(
                "Session {} is no longer active (status '{}')",
                session.id,
                session.status()
            )));
        }

        let (answered, session) = self
            .cancellations
            .record_response(request_id, response)
            .await?
            .ok_or_else(|| {
                tracing::warn!(
                    session_id = session.id,
                    request_id,
                    "Cancellation request or session moved on before the response was recorded",
                );
                CoreError::Conflict(format!(
                    "Cancellation request {request_id} was answered or its session left active state"
                ))
            })?;

        let event_type = match response {
            CancelResponse::Agree => event_types::SESSION_CANCELED,
            CancelResponse::Dispute => event_types::SESSION_DISPUTED,
        };

        tracing::info!(
            session_id = session.id,
            request_id,
            responded_by = by,
            status = %session.status(),
            "Cancellation response recorded",
        );
        self.sink.notify(
            LifecycleEvent::new(event_type, entity_types::SESSION, session.id, by)
                .notify(request.initiator_id)
                .with_payload(json!({ "cancel_request_id": request_id })),
        );

        Ok(CancellationOutcome {
            request: answered,
            session,
        })
    }

    /// An admin settles a disputed cancellation.
    pub async fn resolve_dispute(
        &self,
        request_id: CancelRequestId,
        actor: Actor,
        resolution: CancelResolution,
        admin_notes: Option<&str>,
    ) -> CoreResult<CancellationOutcome> {
        require_admin(actor, "resolve cancellation disputes")?;
        if resolution.session_outcome().is_none() {
            return Err(CoreError::Validation(
                "A dispute cannot be resolved to 'pending'".into(),
            ));
        }
        if let Some(notes) = admin_notes {
            validate_admin_notes(notes)?;
        }

        let request = self.load_request(request_id).await?;
        if request.response_status != CancelResponseStatus::Disputed || !request.is_open() {
            return Err(CoreError::Conflict(format!(
                "Cancellation request {request_id} is not an open dispute"
            )));
        }

        let (resolved, session) = self
            .cancellations
            .resolve_dispute(request_id, resolution, actor.user_id, admin_notes)
            .await?
            .ok_or_else(|| {
                tracing::warn!(
                    session_id = request.session_id,
                    request_id,
                    "Dispute or its session changed before the dispute was settled",
                );
                CoreError::Conflict(format!(
                    "Dispute {request_id} was resolved or its session is no longer disputed"
                ))
            })?;

        tracing::info!(
            request_id,
            session_id = session.id,
            admin_id = actor.user_id,
            resolution = resolution.as_str(),
            "Dispute resolved",
        );
        self.sink.notify(
            LifecycleEvent::new(
                event_types::DISPUTE_RESOLVED,
                entity_types::CANCEL_REQUEST,
                request_id,
                actor.user_id,
            )
            .notify(session.user1_id)
            .notify(session.user2_id)
            .with_payload(json!({
                "session_id": session.id,
                "resolution": resolution.as_str(),
            })),
        );

        Ok(CancellationOutcome {
            request: resolved,
            session,
        })
    }

    pub async fn list_cancel_requests(
        &self,
        session_id: SessionId,
        actor: Actor,
    ) -> CoreResult<Vec<SessionCancelRequest>> {
        let session = load_session(self.sessions.as_ref(), session_id).await?;
        require_party_or_admin(&session, actor)?;
        self.cancellations.list_for_session(session_id).await
    }

    async fn load_request(&self, id: CancelRequestId) -> CoreResult<SessionCancelRequest> {
        self.cancellations
            .find_by_id(id)
            .await?
            .ok_or(CoreError::not_found("CancelRequest", id))
    }
}
