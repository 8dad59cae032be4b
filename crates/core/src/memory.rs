//! In-memory implementations of every repository trait.
//!
//! All tables sit behind one async mutex, so each precondition-checked write
//! is atomic with respect to every other call. Used by the service tests, the
//! API integration tests, and local runs without a database.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::cancellation::{
    CancelResolution, CancelResponse, CancelResponseStatus, NewCancelRequest, SessionCancelRequest,
};
use crate::completion::{
    CompletionDecision, CompletionRequest, CompletionStatus, ProgressUpdate, RequestForUser,
    SessionProgress,
};
use crate::error::{CoreError, CoreResult};
use crate::events::{LifecycleEvent, NotificationSink};
use crate::meeting::{
    validate_transition as validate_meeting_transition, CancelMeeting, Meeting, MeetingState,
    NewMeeting,
};
use crate::report::{NewReport, Report, ReportResolution, ReportStatus};
use crate::repository::{
    CancelRequestRepository, CompletionRepository, MeetingRepository, ProgressRepository,
    ReportRepository, Repositories, SessionRepository, StandingRepository,
};
use crate::session::{
    validate_transition, NewSession, Session, SessionState, SessionStatus, StoredSessionState,
};
use crate::standing::UserStanding;
use crate::types::{
    CancelRequestId, CompletionRequestId, DbId, MeetingId, ReportId, SessionId, Timestamp, UserId,
};

/// A session as stored: the acceptance flag and status string are kept
/// separately, exactly like the database columns, so drift can be seeded.
#[derive(Debug, Clone)]
struct SessionRow {
    session: Session,
    is_accepted: Option<bool>,
    status: String,
}

impl SessionRow {
    fn load(&self) -> Session {
        let mut session = self.session.clone();
        session.state = SessionState::reconcile(self.is_accepted, &self.status);
        session
    }

    fn matches(&self, state: SessionState) -> bool {
        self.is_accepted == state.is_accepted() && self.status == state.status().as_str()
    }

    fn store(&mut self, state: SessionState, now: Timestamp) {
        self.is_accepted = state.is_accepted();
        self.status = state.status().as_str().to_string();
        self.session.state = state;
        self.session.updated_at = now;
    }
}

#[derive(Default)]
struct Tables {
    next_id: DbId,
    sessions: BTreeMap<SessionId, SessionRow>,
    completions: BTreeMap<CompletionRequestId, CompletionRequest>,
    progress: BTreeMap<(SessionId, UserId), SessionProgress>,
    cancellations: BTreeMap<CancelRequestId, SessionCancelRequest>,
    meetings: BTreeMap<MeetingId, Meeting>,
    meeting_cancellations: BTreeMap<MeetingId, CancelMeeting>,
    reports: BTreeMap<ReportId, Report>,
    standings: BTreeMap<UserId, UserStanding>,
}

impl Tables {
    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }
}

/// Shared in-memory store implementing all repository traits.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Expose this store through every repository trait.
    pub fn repositories(self: &Arc<Self>) -> Repositories {
        Repositories {
            sessions: self.clone(),
            completions: self.clone(),
            progress: self.clone(),
            cancellations: self.clone(),
            meetings: self.clone(),
            reports: self.clone(),
            standings: self.clone(),
        }
    }

    /// Overwrite the stored acceptance flag and status of a session without
    /// any validation, as legacy tooling might have.
    pub async fn overwrite_session_state(
        &self,
        id: SessionId,
        is_accepted: Option<bool>,
        status: &str,
    ) -> CoreResult<()> {
        let mut tables = self.tables.lock().await;
        let row = tables
            .sessions
            .get_mut(&id)
            .ok_or(CoreError::not_found("Session", id))?;
        row.is_accepted = is_accepted;
        row.status = status.to_string();
        Ok(())
    }

    /// Raw stored state of every session, ordered by id.
    pub async fn stored_session_states(&self) -> Vec<StoredSessionState> {
        let tables = self.tables.lock().await;
        tables
            .sessions
            .values()
            .map(|row| StoredSessionState {
                id: row.session.id,
                is_accepted: row.is_accepted,
                status: row.status.clone(),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[async_trait]
impl SessionRepository for InMemoryStore {
    async fn create_within_limit(
        &self,
        input: &NewSession,
        limit: usize,
    ) -> CoreResult<Option<Session>> {
        let mut tables = self.tables.lock().await;
        let pending = tables
            .sessions
            .values()
            .filter(|row| {
                row.session.user1_id == input.user1_id
                    && row.session.user2_id == input.user2_id
                    && row.matches(SessionState::Pending)
            })
            .count();
        if pending >= limit {
            return Ok(None);
        }

        let now = Utc::now();
        let id = tables.next_id();
        let session = Session {
            id,
            user1_id: input.user1_id,
            skill1_id: input.skill1_id,
            description_of_service1: input.description_of_service1.clone(),
            user2_id: input.user2_id,
            skill2_id: input.skill2_id,
            description_of_service2: input.description_of_service2.clone(),
            start_date: input.start_date,
            expected_end_date: input.expected_end_date,
            state: SessionState::Pending,
            created_at: now,
            updated_at: now,
        };
        tables.sessions.insert(
            id,
            SessionRow {
                session: session.clone(),
                is_accepted: None,
                status: SessionStatus::Pending.as_str().to_string(),
            },
        );
        Ok(Some(session))
    }

    async fn find_by_id(&self, id: SessionId) -> CoreResult<Option<Session>> {
        let tables = self.tables.lock().await;
        Ok(tables.sessions.get(&id).map(SessionRow::load))
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
        status: Option<SessionStatus>,
    ) -> CoreResult<Vec<Session>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .sessions
            .values()
            .rev()
            .map(SessionRow::load)
            .filter(|s| s.is_party(user_id))
            .filter(|s| status.map_or(true, |st| s.status() == st))
            .collect())
    }

    async fn transition(
        &self,
        id: SessionId,
        from: SessionState,
        to: SessionState,
    ) -> CoreResult<Option<Session>> {
        validate_transition(from, to)?;
        let mut tables = self.tables.lock().await;
        match tables.sessions.get_mut(&id) {
            Some(row) if row.matches(from) => {
                row.store(to, Utc::now());
                Ok(Some(row.load()))
            }
            _ => Ok(None),
        }
    }

    async fn repair_status_drift(&self) -> CoreResult<u64> {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();
        let mut repaired = 0;
        for row in tables.sessions.values_mut() {
            let state = SessionState::reconcile(row.is_accepted, &row.status);
            if row.status != state.status().as_str() {
                row.store(state, now);
                repaired += 1;
            }
        }
        Ok(repaired)
    }
}

// ---------------------------------------------------------------------------
// Completion requests
// ---------------------------------------------------------------------------

#[async_trait]
impl CompletionRepository for InMemoryStore {
    async fn create_pending(
        &self,
        session_id: SessionId,
        requested_by: UserId,
        request_for_user: RequestForUser,
    ) -> CoreResult<CompletionRequest> {
        let mut tables = self.tables.lock().await;
        let duplicate = tables.completions.values().any(|r| {
            r.session_id == session_id
                && r.requested_by == requested_by
                && r.status == CompletionStatus::Pending
        });
        if duplicate {
            return Err(CoreError::Conflict(format!(
                "User {requested_by} already has a pending completion request for session {session_id}"
            )));
        }

        let now = Utc::now();
        let id = tables.next_id();
        let request = CompletionRequest {
            id,
            session_id,
            requested_by,
            request_for_user,
            status: CompletionStatus::Pending,
            approved_at: None,
            approved_by: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        };
        tables.completions.insert(id, request.clone());
        Ok(request)
    }

    async fn find_by_id(&self, id: CompletionRequestId) -> CoreResult<Option<CompletionRequest>> {
        let tables = self.tables.lock().await;
        Ok(tables.completions.get(&id).cloned())
    }

    async fn list_for_session(&self, session_id: SessionId) -> CoreResult<Vec<CompletionRequest>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .completions
            .values()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn resolve(
        &self,
        id: CompletionRequestId,
        decision: &CompletionDecision,
        decided_by: UserId,
    ) -> CoreResult<Option<CompletionRequest>> {
        let mut tables = self.tables.lock().await;
        let Some(request) = tables
            .completions
            .get_mut(&id)
            .filter(|r| r.status == CompletionStatus::Pending)
        else {
            return Ok(None);
        };

        let now = Utc::now();
        request.status = decision.target_status();
        request.updated_at = now;
        match decision {
            CompletionDecision::Approve => {
                request.approved_at = Some(now);
                request.approved_by = Some(decided_by);
            }
            CompletionDecision::Reject { reason } => {
                request.rejection_reason = Some(reason.clone());
            }
        }
        Ok(Some(request.clone()))
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

#[async_trait]
impl ProgressRepository for InMemoryStore {
    async fn upsert(&self, update: &ProgressUpdate) -> CoreResult<SessionProgress> {
        let mut tables = self.tables.lock().await;
        let row = SessionProgress {
            session_id: update.session_id,
            user_id: update.user_id,
            completion_percentage: update.completion_percentage,
            status: update.status,
            notes: update.notes.clone(),
            updated_at: Utc::now(),
        };
        tables
            .progress
            .insert((update.session_id, update.user_id), row.clone());
        Ok(row)
    }

    async fn list_for_session(&self, session_id: SessionId) -> CoreResult<Vec<SessionProgress>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .progress
            .values()
            .filter(|p| p.session_id == session_id)
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Cancellation requests
// ---------------------------------------------------------------------------

#[async_trait]
impl CancelRequestRepository for InMemoryStore {
    async fn create(&self, input: &NewCancelRequest) -> CoreResult<SessionCancelRequest> {
        let mut tables = self.tables.lock().await;
        if tables
            .cancellations
            .values()
            .any(|r| r.session_id == input.session_id && r.is_open())
        {
            return Err(CoreError::Conflict(format!(
                "Session {} already has an open cancellation request",
                input.session_id
            )));
        }

        let now = Utc::now();
        let id = tables.next_id();
        let request = SessionCancelRequest {
            id,
            session_id: input.session_id,
            initiator_id: input.initiator_id,
            reason: input.reason.clone(),
            description: input.description.clone(),
            evidence_files: input.evidence_files.clone(),
            response_status: CancelResponseStatus::Pending,
            resolution: CancelResolution::Pending,
            responded_at: None,
            resolved_at: None,
            resolved_by: None,
            admin_notes: None,
            created_at: now,
            updated_at: now,
        };
        tables.cancellations.insert(id, request.clone());
        Ok(request)
    }

    async fn find_by_id(&self, id: CancelRequestId) -> CoreResult<Option<SessionCancelRequest>> {
        let tables = self.tables.lock().await;
        Ok(tables.cancellations.get(&id).cloned())
    }

    async fn list_for_session(
        &self,
        session_id: SessionId,
    ) -> CoreResult<Vec<SessionCancelRequest>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .cancellations
            .values()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn record_response(
        &self,
        id: CancelRequestId,
        response: CancelResponse,
    ) -> CoreResult<Option<(SessionCancelRequest, Session)>> {
        let target = response.session_outcome();
        validate_transition(SessionState::Active, target)?;

        let mut guard = self.tables.lock().await;
        let tables = &mut *guard;
        let Some(request) = tables.cancellations.get_mut(&id).filter(|r| {
            r.response_status == CancelResponseStatus::Pending && r.is_open()
        }) else {
            return Ok(None);
        };
        let Some(row) = tables
            .sessions
            .get_mut(&request.session_id)
            .filter(|row| row.matches(SessionState::Active))
        else {
            return Ok(None);
        };

        let now = Utc::now();
        let (response_status, resolution) = response.recorded_as();
        request.response_status = response_status;
        request.resolution = resolution;
        request.responded_at = Some(now);
        if resolution != CancelResolution::Pending {
            request.resolved_at = Some(now);
        }
        request.updated_at = now;
        row.store(target, now);
        Ok(Some((request.clone(), row.load())))
    }

    async fn resolve_dispute(
        &self,
        id: CancelRequestId,
        resolution: CancelResolution,
        admin_id: UserId,
        admin_notes: Option<&str>,
    ) -> CoreResult<Option<(SessionCancelRequest, Session)>> {
        let target = resolution.session_outcome().ok_or_else(|| {
            CoreError::Validation("A dispute cannot be resolved to 'pending'".into())
        })?;
        validate_transition(SessionState::Disputed, target)?;

        let mut guard = self.tables.lock().await;
        let tables = &mut *guard;
        let Some(request) = tables.cancellations.get_mut(&id).filter(|r| {
            r.response_status == CancelResponseStatus::Disputed && r.is_open()
        }) else {
            return Ok(None);
        };
        let Some(row) = tables
            .sessions
            .get_mut(&request.session_id)
            .filter(|row| row.matches(SessionState::Disputed))
        else {
            return Ok(None);
        };

        let now = Utc::now();
        request.resolution = resolution;
        request.resolved_at = Some(now);
        request.resolved_by = Some(admin_id);
        request.admin_notes = admin_notes.map(str::to_string);
        request.updated_at = now;
        row.store(target, now);
        Ok(Some((request.clone(), row.load())))
    }
}

// ---------------------------------------------------------------------------
// Meetings
// ---------------------------------------------------------------------------

#[async_trait]
impl MeetingRepository for InMemoryStore {
    async fn create(&self, input: &NewMeeting) -> CoreResult<Meeting> {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();
        let id = tables.next_id();
        let meeting = Meeting {
            id,
            sender_id: input.sender_id,
            receiver_id: input.receiver_id,
            description: input.description.clone(),
            meeting_time: input.meeting_time,
            meeting_link: input.meeting_link.clone(),
            state: MeetingState::Pending,
            accept_status: false,
            created_at: now,
            updated_at: now,
        };
        tables.meetings.insert(id, meeting.clone());
        Ok(meeting)
    }

    async fn find_by_id(&self, id: MeetingId) -> CoreResult<Option<Meeting>> {
        let tables = self.tables.lock().await;
        Ok(tables.meetings.get(&id).cloned())
    }

    async fn list_for_user(&self, user_id: UserId) -> CoreResult<Vec<Meeting>> {
        let tables = self.tables.lock().await;
        let mut meetings: Vec<Meeting> = tables
            .meetings
            .values()
            .filter(|m| m.is_party(user_id))
            .cloned()
            .collect();
        meetings.sort_by_key(|m| m.meeting_time);
        Ok(meetings)
    }

    async fn transition(
        &self,
        id: MeetingId,
        from: MeetingState,
        to: MeetingState,
    ) -> CoreResult<Option<Meeting>> {
        validate_meeting_transition(from, to)?;
        let mut tables = self.tables.lock().await;
        let Some(meeting) = tables.meetings.get_mut(&id).filter(|m| m.state == from) else {
            return Ok(None);
        };
        meeting.state = to;
        if to == MeetingState::Accepted {
            meeting.accept_status = true;
        }
        meeting.updated_at = Utc::now();
        Ok(Some(meeting.clone()))
    }

    async fn cancel(
        &self,
        id: MeetingId,
        from: MeetingState,
        cancelled_by: UserId,
        reason: &str,
    ) -> CoreResult<Option<(Meeting, CancelMeeting)>> {
        validate_meeting_transition(from, MeetingState::Cancelled)?;
        let mut tables = self.tables.lock().await;
        let now = Utc::now();
        let record_id = tables.next_id();
        let Some(meeting) = tables.meetings.get_mut(&id).filter(|m| m.state == from) else {
            return Ok(None);
        };
        meeting.state = MeetingState::Cancelled;
        meeting.updated_at = now;
        let meeting = meeting.clone();

        let record = CancelMeeting {
            id: record_id,
            meeting_id: id,
            cancelled_by,
            reason: reason.to_string(),
            acknowledged: false,
            acknowledged_by: None,
            acknowledged_at: None,
            created_at: now,
        };
        tables.meeting_cancellations.insert(id, record.clone());
        Ok(Some((meeting, record)))
    }

    async fn find_cancellation(&self, meeting_id: MeetingId) -> CoreResult<Option<CancelMeeting>> {
        let tables = self.tables.lock().await;
        Ok(tables.meeting_cancellations.get(&meeting_id).cloned())
    }

    async fn acknowledge_cancellation(
        &self,
        meeting_id: MeetingId,
        acknowledged_by: UserId,
    ) -> CoreResult<Option<CancelMeeting>> {
        let mut tables = self.tables.lock().await;
        let Some(record) = tables
            .meeting_cancellations
            .get_mut(&meeting_id)
            .filter(|c| !c.acknowledged)
        else {
            return Ok(None);
        };
        record.acknowledged = true;
        record.acknowledged_by = Some(acknowledged_by);
        record.acknowledged_at = Some(Utc::now());
        Ok(Some(record.clone()))
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[async_trait]
impl ReportRepository for InMemoryStore {
    async fn create(&self, input: &NewReport) -> CoreResult<Report> {
        let mut tables = self.tables.lock().await;
        if tables.reports.values().any(|r| {
            r.session_id == input.session_id
                && r.reported_by == input.reported_by
                && r.status != ReportStatus::Resolved
        }) {
            return Err(CoreError::Conflict(format!(
                "User {} already has an unresolved report on session {}",
                input.reported_by, input.session_id
            )));
        }

        let now = Utc::now();
        let id = tables.next_id();
        let report = Report {
            id,
            reported_by: input.reported_by,
            reported_user: input.reported_user,
            session_id: input.session_id,
            reason: input.reason.clone(),
            description: input.description.clone(),
            status: ReportStatus::Pending,
            resolution: None,
            admin_response: None,
            admin_notes: None,
            reviewed_by: None,
            opened_at: None,
            resolved_by: None,
            resolved_at: None,
            created_at: now,
            updated_at: now,
        };
        tables.reports.insert(id, report.clone());
        Ok(report)
    }

    async fn find_by_id(&self, id: ReportId) -> CoreResult<Option<Report>> {
        let tables = self.tables.lock().await;
        Ok(tables.reports.get(&id).cloned())
    }

    async fn list(&self, status: Option<ReportStatus>) -> CoreResult<Vec<Report>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .reports
            .values()
            .rev()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect())
    }

    async fn mark_under_review(
        &self,
        id: ReportId,
        admin_id: UserId,
    ) -> CoreResult<Option<Report>> {
        let mut tables = self.tables.lock().await;
        let Some(report) = tables
            .reports
            .get_mut(&id)
            .filter(|r| r.status == ReportStatus::Pending)
        else {
            return Ok(None);
        };
        let now = Utc::now();
        report.status = ReportStatus::UnderReview;
        report.reviewed_by = Some(admin_id);
        report.opened_at = Some(now);
        report.updated_at = now;
        Ok(Some(report.clone()))
    }

    async fn resolve(
        &self,
        id: ReportId,
        resolution: ReportResolution,
        admin_id: UserId,
        admin_notes: Option<&str>,
    ) -> CoreResult<Option<Report>> {
        let mut tables = self.tables.lock().await;
        let Some(report) = tables
            .reports
            .get_mut(&id)
            .filter(|r| r.status != ReportStatus::Resolved)
        else {
            return Ok(None);
        };
        let now = Utc::now();
        report.status = ReportStatus::Resolved;
        report.resolution = Some(resolution);
        report.admin_response = Some(resolution.admin_response().to_string());
        report.admin_notes = admin_notes.map(str::to_string);
        report.resolved_by = Some(admin_id);
        report.resolved_at = Some(now);
        report.updated_at = now;
        Ok(Some(report.clone()))
    }
}

// ---------------------------------------------------------------------------
// Standing
// ---------------------------------------------------------------------------

impl Tables {
    fn standing_mut(&mut self, user_id: UserId, now: Timestamp) -> &mut UserStanding {
        let standing = self
            .standings
            .entry(user_id)
            .or_insert_with(|| UserStanding::clean(user_id, now));
        standing.updated_at = now;
        standing
    }
}

#[async_trait]
impl StandingRepository for InMemoryStore {
    async fn find(&self, user_id: UserId) -> CoreResult<Option<UserStanding>> {
        let tables = self.tables.lock().await;
        Ok(tables.standings.get(&user_id).cloned())
    }

    async fn add_warning(&self, user_id: UserId) -> CoreResult<UserStanding> {
        let mut tables = self.tables.lock().await;
        let standing = tables.standing_mut(user_id, Utc::now());
        standing.warning_count += 1;
        Ok(standing.clone())
    }

    async fn set_blocked(&self, user_id: UserId, blocked: bool) -> CoreResult<UserStanding> {
        let mut tables = self.tables.lock().await;
        let standing = tables.standing_mut(user_id, Utc::now());
        standing.is_blocked = blocked;
        Ok(standing.clone())
    }

    async fn set_suspension(
        &self,
        user_id: UserId,
        until: Option<Timestamp>,
        reason: Option<&str>,
    ) -> CoreResult<UserStanding> {
        let mut tables = self.tables.lock().await;
        let standing = tables.standing_mut(user_id, Utc::now());
        standing.suspended_until = until;
        standing.suspension_reason = reason.map(str::to_string);
        Ok(standing.clone())
    }
}

// ---------------------------------------------------------------------------
// Recording sink
// ---------------------------------------------------------------------------

/// Notification sink that keeps every event, for assertions in tests.
#[derive(Default)]
pub struct RecordingSink {
    events: StdMutex<Vec<LifecycleEvent>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Event type names received so far, in order.
    pub fn event_types(&self) -> Vec<&'static str> {
        self.events().iter().map(|e| e.event_type).collect()
    }

    pub fn events(&self) -> Vec<LifecycleEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, event: LifecycleEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
