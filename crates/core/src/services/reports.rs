//! Report moderation: file, open for review, resolve.

use std::sync::Arc;

use serde_json::json;

use super::{load_session, require_admin};
use crate::error::{CoreError, CoreResult};
use crate::events::{entity_types, event_types, LifecycleEvent, NotificationSink};
use crate::report::{validate_admin_notes, NewReport, Report, ReportResolution, ReportStatus};
use crate::repository::{ReportRepository, SessionRepository, StandingRepository};
use crate::types::{Actor, ReportId};

#[derive(Clone)]
pub struct ReportResolver {
    sessions: Arc<dyn SessionRepository>,
    reports: Arc<dyn ReportRepository>,
    standings: Arc<dyn StandingRepository>,
    sink: Arc<dyn NotificationSink>,
}

impl ReportResolver {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        reports: Arc<dyn ReportRepository>,
        standings: Arc<dyn StandingRepository>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            sessions,
            reports,
            standings,
            sink,
        }
    }

    /// One session party reports the other.
    pub async fn file_report(&self, input: &NewReport) -> CoreResult<Report> {
        input.validate()?;
        let session = load_session(self.sessions.as_ref(), input.session_id).await?;
        if !session.is_party(input.reported_by) {
            return Err(CoreError::Forbidden(format!(
                "User {} is not a party to session {}",
                input.reported_by, session.id
            )));
        }
        if session.counterparty(input.reported_by) != Some(input.reported_user) {
            return Err(CoreError::Validation(format!(
                "User {} is not the other party of session {}",
                input.reported_user, session.id
            )));
        }

        let report = self.reports.create(input).await?;

        tracing::info!(
            report_id = report.id,
            session_id = report.session_id,
            reported_by = report.reported_by,
            reported_user = report.reported_user,
            "Report filed",
        );
        self.sink.notify(
            LifecycleEvent::new(
                event_types::REPORT_FILED,
                entity_types::REPORT,
                report.id,
                report.reported_by,
            )
            .with_payload(json!({
                "session_id": report.session_id,
                "reported_user": report.reported_user,
            })),
        );
        Ok(report)
    }

    /// An admin opens a report for review. Opening an already-opened or
    /// resolved report returns it unchanged.
    pub async fn open_report(&self, id: ReportId, actor: Actor) -> CoreResult<Report> {
        require_admin(actor, "review reports")?;
        let report = self.load(id).await?;
        if report.status != ReportStatus::Pending {
            return Ok(report);
        }

        match self.reports.mark_under_review(id, actor.user_id).await? {
            Some(opened) => {
                tracing::info!(report_id = id, admin_id = actor.user_id, "Report under review");
                self.sink.notify(
                    LifecycleEvent::new(
                        event_types::REPORT_OPENED,
                        entity_types::REPORT,
                        id,
                        actor.user_id,
                    )
                    .notify(opened.reported_by),
                );
                Ok(opened)
            }
            None => self.load(id).await,
        }
    }

    /// Resolve a report once. A warning resolution adds a warning to the
    /// affected user's standing.
    ///
    /// A `pending` report may be resolved directly; marking it
    /// `under_review` first is optional.
    pub async fn resolve_report(
        &self,
        id: ReportId,
        resolution: ReportResolution,
        actor: Actor,
        admin_notes: Option<&str>,
    ) -> CoreResult<Report> {
        require_admin(actor, "resolve reports")?;
        if let Some(notes) = admin_notes {
            validate_admin_notes(notes)?;
        }

        let report = self.load(id).await?;
        if report.status == ReportStatus::Resolved {
            return Err(CoreError::Conflict(format!("Report {id} is already resolved")));
        }

        let resolved = self
            .reports
            .resolve(id, resolution, actor.user_id, admin_notes)
            .await?
            .ok_or_else(|| {
                CoreError::Conflict(format!("Report {id} was resolved by another request"))
            })?;

        tracing::info!(
            report_id = id,
            admin_id = actor.user_id,
            resolution = resolution.as_str(),
            "Report resolved",
        );
        self.sink.notify(
            LifecycleEvent::new(
                event_types::REPORT_RESOLVED,
                entity_types::REPORT,
                id,
                actor.user_id,
            )
            .notify(resolved.reported_by)
            .with_payload(json!({
                "resolution": resolution.as_str(),
                "admin_response": resolved.admin_response,
            })),
        );

        if let Some(warned) = resolution.warned_user(&resolved) {
            let standing = self.standings.add_warning(warned).await?;
            tracing::info!(
                user_id = warned,
                warning_count = standing.warning_count,
                report_id = id,
                "User warned",
            );
            self.sink.notify(
                LifecycleEvent::new(
                    event_types::USER_WARNED,
                    entity_types::USER,
                    warned,
                    actor.user_id,
                )
                .notify(warned)
                .with_payload(json!({
                    "report_id": id,
                    "warning_count": standing.warning_count,
                })),
            );
        }

        Ok(resolved)
    }

    pub async fn list_reports(
        &self,
        actor: Actor,
        status: Option<ReportStatus>,
    ) -> CoreResult<Vec<Report>> {
        require_admin(actor, "list reports")?;
        self.reports.list(status).await
    }

    /// Fetch a single report. Visible to admins and to the reporter.
    pub async fn get_report(&self, id: ReportId, actor: Actor) -> CoreResult<Report> {
        let report = self.load(id).await?;
        if !actor.is_admin && actor.user_id != report.reported_by {
            return Err(CoreError::Forbidden(format!(
                "User {} cannot view report {id}",
                actor.user_id
            )));
        }
        Ok(report)
    }

    async fn load(&self, id: ReportId) -> CoreResult<Report> {
        self.reports
            .find_by_id(id)
            .await?
            .ok_or(CoreError::not_found("Report", id))
    }
}
