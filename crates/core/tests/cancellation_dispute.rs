//! Cancellation requests, counterparty responses, and dispute resolution.

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;

use common::{admin, harness, ALICE, BOB, CAROL};
use skillswap_core::cancellation::{
    CancelResolution, CancelResponse, CancelResponseStatus, NewCancelRequest,
    SessionCancelRequest,
};
use skillswap_core::error::{CoreError, CoreResult};
use skillswap_core::events::event_types;
use skillswap_core::memory::{InMemoryStore, RecordingSink};
use skillswap_core::repository::{CancelRequestRepository, Repositories, SessionRepository};
use skillswap_core::services::Services;
use skillswap_core::session::{Session, SessionState};
use skillswap_core::types::{Actor, CancelRequestId, SessionId, UserId};

fn cancel_request(session_id: SessionId, initiator_id: UserId) -> NewCancelRequest {
    NewCancelRequest {
        session_id,
        initiator_id,
        reason: "Schedule no longer works".to_string(),
        description: None,
        evidence_files: Vec::new(),
    }
}

#[tokio::test]
async fn agreed_cancellation_cancels_session() {
    let h = harness();
    let session = h.active_session(ALICE, BOB).await;

    let request = h
        .services
        .cancellations
        .request_cancellation(&cancel_request(session.id, ALICE))
        .await
        .unwrap();
    let outcome = h
        .services
        .cancellations
        .respond_cancellation(request.id, BOB, CancelResponse::Agree)
        .await
        .unwrap();

    assert_eq!(outcome.request.response_status, CancelResponseStatus::Agreed);
    assert_eq!(outcome.request.resolution, CancelResolution::Canceled);
    assert_eq!(outcome.session.state, SessionState::Canceled);
    assert_eq!(outcome.session.is_accepted(), Some(true));
    assert!(h.sink.event_types().contains(&event_types::SESSION_CANCELED));
}

#[tokio::test]
async fn disputed_cancellation_waits_for_admin() {
    let h = harness();
    let session = h.active_session(ALICE, BOB).await;
    let cancellations = &h.services.cancellations;

    let request = cancellations
        .request_cancellation(&cancel_request(session.id, BOB))
        .await
        .unwrap();
    let outcome = cancellations
        .respond_cancellation(request.id, ALICE, CancelResponse::Dispute)
        .await
        .unwrap();
    assert_eq!(outcome.session.state, SessionState::Disputed);
    assert!(outcome.request.is_open());

    let resolved = cancellations
        .resolve_dispute(
            request.id,
            admin(),
            CancelResolution::Continued,
            Some("Both parties agreed to reschedule"),
        )
        .await
        .unwrap();
    assert_eq!(resolved.session.state, SessionState::Active);
    assert_eq!(resolved.request.resolution, CancelResolution::Continued);
    assert!(!resolved.request.is_open());

    // Settled disputes cannot be settled again.
    assert_matches!(
        cancellations
            .resolve_dispute(request.id, admin(), CancelResolution::Canceled, None)
            .await,
        Err(CoreError::Conflict(_))
    );
}

#[tokio::test]
async fn partial_completion_cancels_session() {
    let h = harness();
    let session = h.active_session(ALICE, BOB).await;
    let cancellations = &h.services.cancellations;

    let request = cancellations
        .request_cancellation(&cancel_request(session.id, ALICE))
        .await
        .unwrap();
    cancellations
        .respond_cancellation(request.id, BOB, CancelResponse::Dispute)
        .await
        .unwrap();
    let resolved = cancellations
        .resolve_dispute(request.id, admin(), CancelResolution::PartialCompletion, None)
        .await
        .unwrap();
    assert_eq!(resolved.session.state, SessionState::Canceled);
}

#[tokio::test]
async fn initiator_cannot_answer_own_request() {
    let h = harness();
    let session = h.active_session(ALICE, BOB).await;
    let request = h
        .services
        .cancellations
        .request_cancellation(&cancel_request(session.id, ALICE))
        .await
        .unwrap();

    assert_matches!(
        h.services
            .cancellations
            .respond_cancellation(request.id, ALICE, CancelResponse::Agree)
            .await,
        Err(CoreError::Forbidden(_))
    );
    assert_matches!(
        h.services
            .cancellations
            .respond_cancellation(request.id, CAROL, CancelResponse::Agree)
            .await,
        Err(CoreError::Forbidden(_))
    );
}

#[tokio::test]
async fn only_one_open_request_per_session() {
    let h = harness();
    let session = h.active_session(ALICE, BOB).await;
    h.services
        .cancellations
        .request_cancellation(&cancel_request(session.id, ALICE))
        .await
        .unwrap();

    assert_matches!(
        h.services
            .cancellations
            .request_cancellation(&cancel_request(session.id, BOB))
            .await,
        Err(CoreError::Conflict(_))
    );
}

#[tokio::test]
async fn pending_session_cannot_be_canceled_by_request() {
    let h = harness();
    let session = h
        .services
        .sessions
        .propose_session(&common::new_session(ALICE, BOB))
        .await
        .unwrap();

    assert_matches!(
        h.services
            .cancellations
            .request_cancellation(&cancel_request(session.id, ALICE))
            .await,
        Err(CoreError::Conflict(_))
    );
}

#[tokio::test]
async fn dispute_resolution_requires_admin() {
    let h = harness();
    let session = h.active_session(ALICE, BOB).await;
    let request = h
        .services
        .cancellations
        .request_cancellation(&cancel_request(session.id, ALICE))
        .await
        .unwrap();
    h.services
        .cancellations
        .respond_cancellation(request.id, BOB, CancelResponse::Dispute)
        .await
        .unwrap();

    assert_matches!(
        h.services
            .cancellations
            .resolve_dispute(request.id, Actor::user(BOB), CancelResolution::Canceled, None)
            .await,
        Err(CoreError::Forbidden(_))
    );
    assert_matches!(
        h.services
            .cancellations
            .resolve_dispute(request.id, admin(), CancelResolution::Pending, None)
            .await,
        Err(CoreError::Validation(_))
    );
}

#[tokio::test]
async fn undisputed_request_cannot_be_resolved_by_admin() {
    let h = harness();
    let session = h.active_session(ALICE, BOB).await;
    let request = h
        .services
        .cancellations
        .request_cancellation(&cancel_request(session.id, ALICE))
        .await
        .unwrap();

    assert_matches!(
        h.services
            .cancellations
            .resolve_dispute(request.id, admin(), CancelResolution::Canceled, None)
            .await,
        Err(CoreError::Conflict(_))
    );
}

/// Cancel-request store whose session is moved by another writer just before
/// each response or resolution lands.
struct SessionMovedUnderneath {
    store: Arc<InMemoryStore>,
    from: SessionState,
    to: SessionState,
}

impl SessionMovedUnderneath {
    async fn move_session(&self, id: CancelRequestId) -> CoreResult<()> {
        let request = CancelRequestRepository::find_by_id(self.store.as_ref(), id)
            .await?
            .ok_or(CoreError::not_found("CancelRequest", id))?;
        SessionRepository::transition(self.store.as_ref(), request.session_id, self.from, self.to)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CancelRequestRepository for SessionMovedUnderneath {
    async fn create(&self, input: &NewCancelRequest) -> CoreResult<SessionCancelRequest> {
        CancelRequestRepository::create(self.store.as_ref(), input).await
    }

    async fn find_by_id(&self, id: CancelRequestId) -> CoreResult<Option<SessionCancelRequest>> {
        CancelRequestRepository::find_by_id(self.store.as_ref(), id).await
    }

    async fn list_for_session(
        &self,
        session_id: SessionId,
    ) -> CoreResult<Vec<SessionCancelRequest>> {
        CancelRequestRepository::list_for_session(self.store.as_ref(), session_id).await
    }

    async fn record_response(
        &self,
        id: CancelRequestId,
        response: CancelResponse,
    ) -> CoreResult<Option<(SessionCancelRequest, Session)>> {
        self.move_session(id).await?;
        CancelRequestRepository::record_response(self.store.as_ref(), id, response).await
    }

    async fn resolve_dispute(
        &self,
        id: CancelRequestId,
        resolution: CancelResolution,
        admin_id: UserId,
        admin_notes: Option<&str>,
    ) -> CoreResult<Option<(SessionCancelRequest, Session)>> {
        self.move_session(id).await?;
        CancelRequestRepository::resolve_dispute(
            self.store.as_ref(),
            id,
            resolution,
            admin_id,
            admin_notes,
        )
        .await
    }
}

fn services_with_moving_session(
    store: &Arc<InMemoryStore>,
    from: SessionState,
    to: SessionState,
) -> Services {
    let cancellations: Arc<dyn CancelRequestRepository> = Arc::new(SessionMovedUnderneath {
        store: store.clone(),
        from,
        to,
    });
    Services::new(
        Repositories {
            cancellations,
            ..store.repositories()
        },
        RecordingSink::new(),
    )
}

#[tokio::test]
async fn response_leaves_request_pending_when_session_completes_first() {
    let h = harness();
    let session = h.active_session(ALICE, BOB).await;
    let request = h
        .services
        .cancellations
        .request_cancellation(&cancel_request(session.id, ALICE))
        .await
        .unwrap();

    let racing =
        services_with_moving_session(&h.store, SessionState::Active, SessionState::Completed);
    assert_matches!(
        racing
            .cancellations
            .respond_cancellation(request.id, BOB, CancelResponse::Agree)
            .await,
        Err(CoreError::Conflict(_))
    );

    let stored = CancelRequestRepository::find_by_id(h.store.as_ref(), request.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.response_status, CancelResponseStatus::Pending);
    assert_eq!(stored.resolution, CancelResolution::Pending);
    assert!(stored.responded_at.is_none());
    assert!(stored.is_open());

    let session = SessionRepository::find_by_id(h.store.as_ref(), session.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.state, SessionState::Completed);
}

#[tokio::test]
async fn dispute_stays_open_when_session_leaves_disputed_first() {
    let h = harness();
    let session = h.active_session(ALICE, BOB).await;
    let cancellations = &h.services.cancellations;
    let request = cancellations
        .request_cancellation(&cancel_request(session.id, ALICE))
        .await
        .unwrap();
    cancellations
        .respond_cancellation(request.id, BOB, CancelResponse::Dispute)
        .await
        .unwrap();

    let racing =
        services_with_moving_session(&h.store, SessionState::Disputed, SessionState::Active);
    assert_matches!(
        racing
            .cancellations
            .resolve_dispute(request.id, admin(), CancelResolution::Canceled, None)
            .await,
        Err(CoreError::Conflict(_))
    );

    let stored = CancelRequestRepository::find_by_id(h.store.as_ref(), request.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.response_status, CancelResponseStatus::Disputed);
    assert_eq!(stored.resolution, CancelResolution::Pending);
    assert!(stored.resolved_by.is_none());

    let session = SessionRepository::find_by_id(h.store.as_ref(), session.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.state, SessionState::Active);
}
