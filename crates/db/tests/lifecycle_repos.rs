//! Conditional-write behaviour of the PostgreSQL repositories.

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use sqlx::PgPool;

use skillswap_core::cancellation::{
    CancelResolution, CancelResponse, CancelResponseStatus, NewCancelRequest,
};
use skillswap_core::completion::{CompletionDecision, CompletionStatus, RequestForUser};
use skillswap_core::error::CoreError;
use skillswap_core::meeting::{MeetingState, NewMeeting};
use skillswap_core::report::{NewReport, ReportResolution, ReportStatus};
use skillswap_core::repository::Repositories;
use skillswap_core::session::{NewSession, Session, SessionState, SessionStatus};
use skillswap_db::repositories::{pg_repositories, EventRepo};

const ALICE: i64 = 1;
const BOB: i64 = 2;
const ADMIN: i64 = 99;

fn new_session() -> NewSession {
    NewSession {
        user1_id: ALICE,
        skill1_id: 10,
        description_of_service1: "Guitar lessons, one hour weekly".to_string(),
        user2_id: BOB,
        skill2_id: 20,
        description_of_service2: "Conversational Spanish practice".to_string(),
        start_date: Utc::now() + Duration::days(1),
        expected_end_date: None,
    }
}

async fn active_session(repos: &Repositories) -> Session {
    let session = repos
        .sessions
        .create_within_limit(&new_session(), 3)
        .await
        .unwrap()
        .unwrap();
    repos
        .sessions
        .transition(session.id, SessionState::Pending, SessionState::Active)
        .await
        .unwrap()
        .unwrap()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_pending_capacity_per_pair(pool: PgPool) {
    let repos = pg_repositories(&pool);
    for _ in 0..2 {
        assert!(repos
            .sessions
            .create_within_limit(&new_session(), 2)
            .await
            .unwrap()
            .is_some());
    }
    assert!(repos
        .sessions
        .create_within_limit(&new_session(), 2)
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_session_transition_is_conditional(pool: PgPool) {
    let repos = pg_repositories(&pool);
    let session = active_session(&repos).await;
    assert_eq!(session.state, SessionState::Active);

    // A second writer expecting `pending` loses.
    assert!(repos
        .sessions
        .transition(session.id, SessionState::Pending, SessionState::Declined)
        .await
        .unwrap()
        .is_none());

    let listed = repos
        .sessions
        .list_for_user(BOB, Some(SessionStatus::Active))
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_repair_status_drift(pool: PgPool) {
    let repos = pg_repositories(&pool);
    let session = active_session(&repos).await;

    sqlx::query("UPDATE sessions SET status = 'pending' WHERE id = $1")
        .bind(session.id)
        .execute(&pool)
        .await
        .unwrap();

    assert_eq!(repos.sessions.repair_status_drift().await.unwrap(), 1);
    assert_eq!(repos.sessions.repair_status_drift().await.unwrap(), 0);

    let status: (String,) = sqlx::query_as("SELECT status FROM sessions WHERE id = $1")
        .bind(session.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(status.0, "active");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_completion_request_resolves_once(pool: PgPool) {
    let repos = pg_repositories(&pool);
    let session = active_session(&repos).await;

    let request = repos
        .completions
        .create_pending(session.id, ALICE, RequestForUser::User1)
        .await
        .unwrap();
    assert_matches!(
        repos
            .completions
            .create_pending(session.id, ALICE, RequestForUser::User1)
            .await,
        Err(CoreError::Conflict(_))
    );

    let approved = repos
        .completions
        .resolve(request.id, &CompletionDecision::Approve, BOB)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(approved.status, CompletionStatus::Approved);
    assert_eq!(approved.approved_by, Some(BOB));

    let reject = CompletionDecision::Reject {
        reason: "Too late".to_string(),
    };
    assert!(repos
        .completions
        .resolve(request.id, &reject, BOB)
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_cancel_request_dispute_flow(pool: PgPool) {
    let repos = pg_repositories(&pool);
    let session = active_session(&repos).await;
    let input = NewCancelRequest {
        session_id: session.id,
        initiator_id: ALICE,
        reason: "Schedule no longer works".to_string(),
        description: None,
        evidence_files: vec!["https://files.example.com/1.png".to_string()],
    };

    let request = repos.cancellations.create(&input).await.unwrap();
    assert_eq!(request.evidence_files.len(), 1);
    assert_matches!(
        repos.cancellations.create(&input).await,
        Err(CoreError::Conflict(_))
    );

    // Not disputed yet.
    assert!(repos
        .cancellations
        .resolve_dispute(request.id, CancelResolution::Canceled, ADMIN, None)
        .await
        .unwrap()
        .is_none());

    let (disputed, session_after) = repos
        .cancellations
        .record_response(request.id, CancelResponse::Dispute)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(disputed.response_status, CancelResponseStatus::Disputed);
    assert_eq!(disputed.resolution, CancelResolution::Pending);
    assert_eq!(session_after.state, SessionState::Disputed);

    let (settled, session_after) = repos
        .cancellations
        .resolve_dispute(request.id, CancelResolution::Continued, ADMIN, Some("Resume"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(settled.resolution, CancelResolution::Continued);
    assert!(settled.resolved_at.is_some());
    assert_eq!(session_after.state, SessionState::Active);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_cancel_response_rolls_back_when_session_moved_on(pool: PgPool) {
    let repos = pg_repositories(&pool);
    let session = active_session(&repos).await;
    let request = repos
        .cancellations
        .create(&NewCancelRequest {
            session_id: session.id,
            initiator_id: ALICE,
            reason: "Moving abroad".to_string(),
            description: None,
            evidence_files: vec![],
        })
        .await
        .unwrap();

    repos
        .sessions
        .transition(session.id, SessionState::Active, SessionState::Completed)
        .await
        .unwrap()
        .unwrap();

    assert!(repos
        .cancellations
        .record_response(request.id, CancelResponse::Agree)
        .await
        .unwrap()
        .is_none());

    let untouched = repos.cancellations.find_by_id(request.id).await.unwrap().unwrap();
    assert_eq!(untouched.response_status, CancelResponseStatus::Pending);
    assert_eq!(untouched.resolution, CancelResolution::Pending);
    assert!(untouched.responded_at.is_none());
    let stored = repos.sessions.find_by_id(session.id).await.unwrap().unwrap();
    assert_eq!(stored.state, SessionState::Completed);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_illegal_transitions_are_rejected(pool: PgPool) {
    let repos = pg_repositories(&pool);
    let session = repos.sessions.create_within_limit(&new_session(), 3).await.unwrap().unwrap();
    assert_matches!(
        repos
            .sessions
            .transition(session.id, SessionState::Pending, SessionState::Completed)
            .await,
        Err(CoreError::Conflict(_))
    );
    let stored = repos.sessions.find_by_id(session.id).await.unwrap().unwrap();
    assert_eq!(stored.state, SessionState::Pending);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_meeting_cancel_and_acknowledge(pool: PgPool) {
    let repos = pg_repositories(&pool);
    let meeting = repos
        .meetings
        .create(&NewMeeting {
            sender_id: ALICE,
            receiver_id: BOB,
            description: "Kick-off call".to_string(),
            meeting_time: Utc::now() + Duration::hours(4),
            meeting_link: None,
        })
        .await
        .unwrap();

    let accepted = repos
        .meetings
        .transition(meeting.id, MeetingState::Pending, MeetingState::Accepted)
        .await
        .unwrap()
        .unwrap();
    assert!(accepted.accept_status);

    let (cancelled, record) = repos
        .meetings
        .cancel(meeting.id, MeetingState::Accepted, BOB, "Feeling unwell")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cancelled.state, MeetingState::Cancelled);
    assert_eq!(record.cancelled_by, BOB);

    // The losing writer leaves no cancellation row behind.
    assert!(repos
        .meetings
        .cancel(meeting.id, MeetingState::Accepted, ALICE, "Duplicate")
        .await
        .unwrap()
        .is_none());

    let ack = repos
        .meetings
        .acknowledge_cancellation(meeting.id, ALICE)
        .await
        .unwrap()
        .unwrap();
    assert!(ack.acknowledged);
    assert!(repos
        .meetings
        .acknowledge_cancellation(meeting.id, ALICE)
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_report_resolution_is_final(pool: PgPool) {
    let repos = pg_repositories(&pool);
    let session = active_session(&repos).await;
    let report = repos
        .reports
        .create(&NewReport {
            reported_by: ALICE,
            reported_user: BOB,
            session_id: session.id,
            reason: "No-show".to_string(),
            description: None,
        })
        .await
        .unwrap();

    let opened = repos
        .reports
        .mark_under_review(report.id, ADMIN)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(opened.status, ReportStatus::UnderReview);

    let resolved = repos
        .reports
        .resolve(report.id, ReportResolution::Dismiss, ADMIN, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        resolved.admin_response.as_deref(),
        Some(ReportResolution::Dismiss.admin_response())
    );
    assert!(repos
        .reports
        .resolve(report.id, ReportResolution::WarnReported, ADMIN, None)
        .await
        .unwrap()
        .is_none());

    let resolved_list = repos
        .reports
        .list(Some(ReportStatus::Resolved))
        .await
        .unwrap();
    assert_eq!(resolved_list.len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_standing_upserts(pool: PgPool) {
    let repos = pg_repositories(&pool);
    assert!(repos.standings.find(BOB).await.unwrap().is_none());

    repos.standings.add_warning(BOB).await.unwrap();
    let standing = repos.standings.add_warning(BOB).await.unwrap();
    assert_eq!(standing.warning_count, 2);

    let blocked = repos.standings.set_blocked(BOB, true).await.unwrap();
    assert!(blocked.is_blocked);
    assert_eq!(blocked.warning_count, 2);

    let until = Utc::now() + Duration::days(3);
    let suspended = repos
        .standings
        .set_suspension(BOB, Some(until), Some("Abuse"))
        .await
        .unwrap();
    assert!(suspended.suspended_until.is_some());
    assert_eq!(suspended.suspension_reason.as_deref(), Some("Abuse"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_event_insert_persists_recipients(pool: PgPool) {
    let payload = serde_json::json!({ "status": "active" });
    let accepted =
        EventRepo::insert(&pool, "session.accepted", "session", 7, BOB, &[ALICE, BOB], &payload)
            .await
            .unwrap();
    let proposed = EventRepo::insert(&pool, "meeting.proposed", "meeting", 3, ALICE, &[BOB], &payload)
        .await
        .unwrap();
    assert!(proposed > accepted);

    let for_alice: Vec<(String, i64)> = sqlx::query_as(
        "SELECT event_type, entity_id FROM platform_events \
         WHERE $1 = ANY(recipients) ORDER BY id",
    )
    .bind(ALICE)
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(for_alice, vec![("session.accepted".to_string(), 7)]);

    let stored: serde_json::Value =
        sqlx::query_scalar("SELECT payload FROM platform_events WHERE id = $1")
            .bind(proposed)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(stored, payload);
}
