//! Storage boundary for the lifecycle services.
//!
//! One trait per aggregate. Every mutating method is a precondition-checked
//! write: it applies only if the record is still in the expected state and
//! returns `Ok(None)` otherwise, so concurrent callers get at-most-one-winner
//! semantics without locks. Uniqueness violations surface as
//! [`CoreError::Conflict`](crate::error::CoreError::Conflict).

use std::sync::Arc;

use async_trait::async_trait;

use crate::cancellation::{CancelResolution, CancelResponse, NewCancelRequest, SessionCancelRequest};
use crate::completion::{
    CompletionDecision, CompletionRequest, ProgressUpdate, RequestForUser, SessionProgress,
};
use crate::error::CoreResult;
use crate::meeting::{CancelMeeting, Meeting, MeetingState, NewMeeting};
use crate::report::{NewReport, Report, ReportResolution, ReportStatus};
use crate::session::{NewSession, Session, SessionState, SessionStatus};
use crate::standing::UserStanding;
use crate::types::{
    CancelRequestId, CompletionRequestId, MeetingId, ReportId, SessionId, Timestamp, UserId,
};

#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Insert a pending session unless the proposer already has `limit`
    /// pending proposals to the same receiver. Returns `None` at capacity.
    async fn create_within_limit(
        &self,
        input: &NewSession,
        limit: usize,
    ) -> CoreResult<Option<Session>>;

    async fn find_by_id(&self, id: SessionId) -> CoreResult<Option<Session>>;

    /// Sessions where the user is either party, newest first.
    async fn list_for_user(
        &self,
        user_id: UserId,
        status: Option<SessionStatus>,
    ) -> CoreResult<Vec<Session>>;

    /// Move a session from `from` to `to` only if it is still in `from`.
    /// Fails with `Conflict` if `from -> to` is not a session transition.
    async fn transition(
        &self,
        id: SessionId,
        from: SessionState,
        to: SessionState,
    ) -> CoreResult<Option<Session>>;

    /// Recompute every stored status from its acceptance flag. Returns the
    /// number of rows that changed.
    async fn repair_status_drift(&self) -> CoreResult<u64>;
}

#[async_trait]
pub trait CompletionRepository: Send + Sync {
    /// Fails with `Conflict` if the requester already has a pending request
    /// for the session.
    async fn create_pending(
        &self,
        session_id: SessionId,
        requested_by: UserId,
        request_for_user: RequestForUser,
    ) -> CoreResult<CompletionRequest>;

    async fn find_by_id(&self, id: CompletionRequestId) -> CoreResult<Option<CompletionRequest>>;

    async fn list_for_session(&self, session_id: SessionId) -> CoreResult<Vec<CompletionRequest>>;

    /// Apply a decision to a request that is still pending.
    async fn resolve(
        &self,
        id: CompletionRequestId,
        decision: &CompletionDecision,
        decided_by: UserId,
    ) -> CoreResult<Option<CompletionRequest>>;
}

#[async_trait]
pub trait ProgressRepository: Send + Sync {
    async fn upsert(&self, update: &ProgressUpdate) -> CoreResult<SessionProgress>;

    async fn list_for_session(&self, session_id: SessionId) -> CoreResult<Vec<SessionProgress>>;
}

#[async_trait]
pub trait CancelRequestRepository: Send + Sync {
    /// Fails with `Conflict` if the session already has an open request.
    async fn create(&self, input: &NewCancelRequest) -> CoreResult<SessionCancelRequest>;

    async fn find_by_id(&self, id: CancelRequestId) -> CoreResult<Option<SessionCancelRequest>>;

    async fn list_for_session(&self, session_id: SessionId)
        -> CoreResult<Vec<SessionCancelRequest>>;

    /// Record the counterparty's response on a request still awaiting one
    /// and move its session out of `active`, in one write. Agreeing also
    /// resolves the request as `canceled`. Returns `None`, with nothing
    /// changed, if either the request or the session has moved on.
    async fn record_response(
        &self,
        id: CancelRequestId,
        response: CancelResponse,
    ) -> CoreResult<Option<(SessionCancelRequest, Session)>>;

    /// Settle a disputed request that has no resolution yet and move its
    /// session out of `disputed`, in one write.
    async fn resolve_dispute(
        &self,
        id: CancelRequestId,
        resolution: CancelResolution,
        admin_id: UserId,
        admin_notes: Option<&str>,
    ) -> CoreResult<Option<(SessionCancelRequest, Session)>>;
}

#[async_trait]
pub trait MeetingRepository: Send + Sync {
    async fn create(&self, input: &NewMeeting) -> CoreResult<Meeting>;

    async fn find_by_id(&self, id: MeetingId) -> CoreResult<Option<Meeting>>;

    async fn list_for_user(&self, user_id: UserId) -> CoreResult<Vec<Meeting>>;

    /// Move a meeting from `from` to `to` only if it is still in `from`.
    /// Fails with `Conflict` if `from -> to` is not a meeting transition.
    async fn transition(
        &self,
        id: MeetingId,
        from: MeetingState,
        to: MeetingState,
    ) -> CoreResult<Option<Meeting>>;

    /// Atomically cancel a meeting still in `from` and record why.
    async fn cancel(
        &self,
        id: MeetingId,
        from: MeetingState,
        cancelled_by: UserId,
        reason: &str,
    ) -> CoreResult<Option<(Meeting, CancelMeeting)>>;

    async fn find_cancellation(&self, meeting_id: MeetingId) -> CoreResult<Option<CancelMeeting>>;

    /// Mark an unacknowledged cancellation as acknowledged.
    async fn acknowledge_cancellation(
        &self,
        meeting_id: MeetingId,
        acknowledged_by: UserId,
    ) -> CoreResult<Option<CancelMeeting>>;
}

#[async_trait]
pub trait ReportRepository: Send + Sync {
    /// Fails with `Conflict` if the reporter already has an unresolved report
    /// on the session.
    async fn create(&self, input: &NewReport) -> CoreResult<Report>;

    async fn find_by_id(&self, id: ReportId) -> CoreResult<Option<Report>>;

    async fn list(&self, status: Option<ReportStatus>) -> CoreResult<Vec<Report>>;

    /// `pending -> under_review`, recording the reviewing admin.
    async fn mark_under_review(&self, id: ReportId, admin_id: UserId)
        -> CoreResult<Option<Report>>;

    /// Resolve a report that is not yet resolved.
    async fn resolve(
        &self,
        id: ReportId,
        resolution: ReportResolution,
        admin_id: UserId,
        admin_notes: Option<&str>,
    ) -> CoreResult<Option<Report>>;
}

#[async_trait]
pub trait StandingRepository: Send + Sync {
    async fn find(&self, user_id: UserId) -> CoreResult<Option<UserStanding>>;

    async fn add_warning(&self, user_id: UserId) -> CoreResult<UserStanding>;

    async fn set_blocked(&self, user_id: UserId, blocked: bool) -> CoreResult<UserStanding>;

    async fn set_suspension(
        &self,
        user_id: UserId,
        until: Option<Timestamp>,
        reason: Option<&str>,
    ) -> CoreResult<UserStanding>;
}

/// Every repository the services need, behind trait objects.
#[derive(Clone)]
pub struct Repositories {
    pub sessions: Arc<dyn SessionRepository>,
    pub completions: Arc<dyn CompletionRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub cancellations: Arc<dyn CancelRequestRepository>,
    pub meetings: Arc<dyn MeetingRepository>,
    pub reports: Arc<dyn ReportRepository>,
    pub standings: Arc<dyn StandingRepository>,
}
