//! Report filing, review, resolution, and the standing actions around it.

mod common;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};

use common::{admin, harness, Harness, ALICE, BOB, CAROL};
use skillswap_core::error::CoreError;
use skillswap_core::events::event_types;
use skillswap_core::report::{NewReport, Report, ReportResolution, ReportStatus};
use skillswap_core::types::{Actor, SessionId};

fn new_report(session_id: SessionId) -> NewReport {
    NewReport {
        reported_by: ALICE,
        reported_user: BOB,
        session_id,
        reason: "Missed three lessons without notice".to_string(),
        description: None,
    }
}

async fn filed_report(h: &Harness) -> Report {
    let session = h.active_session(ALICE, BOB).await;
    h.services
        .reports
        .file_report(&new_report(session.id))
        .await
        .unwrap()
}

#[tokio::test]
async fn filed_report_starts_pending() {
    let h = harness();
    let report = filed_report(&h).await;
    assert_eq!(report.status, ReportStatus::Pending);
    assert_eq!(report.resolution, None);
    assert!(h.sink.event_types().contains(&event_types::REPORT_FILED));
}

#[tokio::test]
async fn only_session_parties_can_report_each_other() {
    let h = harness();
    let session = h.active_session(ALICE, BOB).await;

    let mut outsider = new_report(session.id);
    outsider.reported_by = CAROL;
    assert_matches!(
        h.services.reports.file_report(&outsider).await,
        Err(CoreError::Forbidden(_))
    );

    let mut wrong_target = new_report(session.id);
    wrong_target.reported_user = CAROL;
    assert_matches!(
        h.services.reports.file_report(&wrong_target).await,
        Err(CoreError::Validation(_))
    );

    assert_matches!(
        h.services.reports.file_report(&new_report(404)).await,
        Err(CoreError::NotFound { .. })
    );
}

#[tokio::test]
async fn duplicate_unresolved_report_conflicts() {
    let h = harness();
    let report = filed_report(&h).await;
    assert_matches!(
        h.services
            .reports
            .file_report(&new_report(report.session_id))
            .await,
        Err(CoreError::Conflict(_))
    );
}

#[tokio::test]
async fn opening_marks_under_review_once() {
    let h = harness();
    let report = filed_report(&h).await;

    let opened = h.services.reports.open_report(report.id, admin()).await.unwrap();
    assert_eq!(opened.status, ReportStatus::UnderReview);
    assert_eq!(opened.reviewed_by, Some(common::ADMIN));
    let opened_at = opened.opened_at;
    assert!(opened_at.is_some());

    let again = h.services.reports.open_report(report.id, admin()).await.unwrap();
    assert_eq!(again.opened_at, opened_at);

    assert_matches!(
        h.services
            .reports
            .open_report(report.id, Actor::user(ALICE))
            .await,
        Err(CoreError::Forbidden(_))
    );
}

#[tokio::test]
async fn resolution_sets_fixed_response_and_is_final() {
    let h = harness();
    let report = filed_report(&h).await;
    h.services.reports.open_report(report.id, admin()).await.unwrap();

    let resolved = h
        .services
        .reports
        .resolve_report(report.id, ReportResolution::Dismiss, admin(), Some("No evidence"))
        .await
        .unwrap();
    assert_eq!(resolved.status, ReportStatus::Resolved);
    assert_eq!(resolved.resolution, Some(ReportResolution::Dismiss));
    assert_eq!(
        resolved.admin_response.as_deref(),
        Some(ReportResolution::Dismiss.admin_response())
    );

    assert_matches!(
        h.services
            .reports
            .resolve_report(report.id, ReportResolution::WarnReported, admin(), None)
            .await,
        Err(CoreError::Conflict(_))
    );
    let after = h.services.reports.get_report(report.id, admin()).await.unwrap();
    assert_eq!(after.admin_response, resolved.admin_response);
}

#[tokio::test]
async fn pending_report_can_be_resolved_directly() {
    let h = harness();
    let report = filed_report(&h).await;
    let resolved = h
        .services
        .reports
        .resolve_report(report.id, ReportResolution::MarkResolved, admin(), None)
        .await
        .unwrap();
    assert_eq!(resolved.status, ReportStatus::Resolved);
}

#[tokio::test]
async fn warn_resolutions_add_warnings() {
    let h = harness();
    let report = filed_report(&h).await;
    h.services
        .reports
        .resolve_report(report.id, ReportResolution::WarnReported, admin(), None)
        .await
        .unwrap();

    let bob = h.services.standing.get_standing(BOB).await.unwrap();
    assert_eq!(bob.warning_count, 1);
    let alice = h.services.standing.get_standing(ALICE).await.unwrap();
    assert_eq!(alice.warning_count, 0);

    // A resolved report frees the reporter to file again.
    let second = h
        .services
        .reports
        .file_report(&new_report(report.session_id))
        .await
        .unwrap();
    h.services
        .reports
        .resolve_report(second.id, ReportResolution::WarnReporter, admin(), None)
        .await
        .unwrap();
    let alice = h.services.standing.get_standing(ALICE).await.unwrap();
    assert_eq!(alice.warning_count, 1);
    assert!(h.sink.event_types().contains(&event_types::USER_WARNED));
}

#[tokio::test]
async fn reports_listed_for_admins_only() {
    let h = harness();
    let report = filed_report(&h).await;

    let pending = h
        .services
        .reports
        .list_reports(admin(), Some(ReportStatus::Pending))
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, report.id);

    assert_matches!(
        h.services.reports.list_reports(Actor::user(ALICE), None).await,
        Err(CoreError::Forbidden(_))
    );
    assert!(h
        .services
        .reports
        .get_report(report.id, Actor::user(ALICE))
        .await
        .is_ok());
    assert_matches!(
        h.services
            .reports
            .get_report(report.id, Actor::user(BOB))
            .await,
        Err(CoreError::Forbidden(_))
    );
}

// ---------------------------------------------------------------------------
// Standing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn blocked_user_cannot_initiate() {
    let h = harness();
    h.services.standing.block_user(admin(), BOB).await.unwrap();
    assert_matches!(
        h.services.standing.ensure_can_initiate(BOB).await,
        Err(CoreError::Forbidden(_))
    );

    h.services.standing.unblock_user(admin(), BOB).await.unwrap();
    assert!(h.services.standing.ensure_can_initiate(BOB).await.is_ok());
}

#[tokio::test]
async fn suspension_is_bounded_and_liftable() {
    let h = harness();
    let standing = &h.services.standing;

    assert_matches!(
        standing
            .suspend_user(admin(), BOB, Utc::now() - Duration::days(1), "Abuse")
            .await,
        Err(CoreError::Validation(_))
    );

    let suspended = standing
        .suspend_user(admin(), BOB, Utc::now() + Duration::days(7), "Repeated no-shows")
        .await
        .unwrap();
    assert!(suspended.is_suspended(Utc::now()));
    assert_matches!(
        standing.ensure_can_initiate(BOB).await,
        Err(CoreError::Forbidden(_))
    );

    let lifted = standing.lift_suspension(admin(), BOB).await.unwrap();
    assert_eq!(lifted.suspended_until, None);
    assert!(standing.ensure_can_initiate(BOB).await.is_ok());
}

#[tokio::test]
async fn standing_changes_require_admin() {
    let h = harness();
    assert_matches!(
        h.services.standing.block_user(Actor::user(ALICE), BOB).await,
        Err(CoreError::Forbidden(_))
    );
    assert_matches!(
        h.services.standing.block_user(admin(), common::ADMIN).await,
        Err(CoreError::Validation(_))
    );
}
