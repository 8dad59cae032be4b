//! Repository for the `session_reports` table.

use async_trait::async_trait;
use skillswap_core::error::{CoreError, CoreResult};
use skillswap_core::report::{NewReport, Report, ReportResolution, ReportStatus};
use skillswap_core::repository::ReportRepository;
use skillswap_core::types::{ReportId, UserId};

use crate::map_db_error;
use crate::models::report::ReportRow;
use crate::DbPool;

/// Column list for `session_reports` queries.
const COLUMNS: &str = "\
    id, reported_by, reported_user, session_id, reason, description, status, \
    resolution, admin_response, admin_notes, reviewed_by, opened_at, \
    resolved_by, resolved_at, created_at, updated_at";

pub struct PgReportRepo {
    pool: DbPool,
}

impl PgReportRepo {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportRepository for PgReportRepo {
    async fn create(&self, input: &NewReport) -> CoreResult<Report> {
        let query = format!(
            "INSERT INTO session_reports \
                (reported_by, reported_user, session_id, reason, description) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, ReportRow>(&query)
            .bind(input.reported_by)
            .bind(input.reported_user)
            .bind(input.session_id)
            .bind(input.reason.trim())
            .bind(&input.description)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match map_db_error(e) {
                CoreError::Conflict(_) => CoreError::Conflict(format!(
                    "An unresolved report on session {} already exists",
                    input.session_id
                )),
                other => other,
            })?;
        Report::try_from(row)
    }

    async fn find_by_id(&self, id: ReportId) -> CoreResult<Option<Report>> {
        let query = format!("SELECT {COLUMNS} FROM session_reports WHERE id = $1");
        sqlx::query_as::<_, ReportRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?
            .map(Report::try_from)
            .transpose()
    }

    async fn list(&self, status: Option<ReportStatus>) -> CoreResult<Vec<Report>> {
        let query = format!(
            "SELECT {COLUMNS} FROM session_reports \
             WHERE ($1::text IS NULL OR status = $1) \
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, ReportRow>(&query)
            .bind(status.map(ReportStatus::as_str))
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?
            .into_iter()
            .map(Report::try_from)
            .collect()
    }

    async fn mark_under_review(
        &self,
        id: ReportId,
        admin_id: UserId,
    ) -> CoreResult<Option<Report>> {
        let query = format!(
            "UPDATE session_reports SET \
                status = 'under_review', reviewed_by = $2, opened_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status = 'pending' \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ReportRow>(&query)
            .bind(id)
            .bind(admin_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?
            .map(Report::try_from)
            .transpose()
    }

    async fn resolve(
        &self,
        id: ReportId,
        resolution: ReportResolution,
        admin_id: UserId,
        admin_notes: Option<&str>,
    ) -> CoreResult<Option<Report>> {
        let query = format!(
            "UPDATE session_reports SET \
                status = 'resolved', \
                resolution = $2, \
                admin_response = $3, \
                admin_notes = $4, \
                resolved_by = $5, \
                resolved_at = NOW(), \
                updated_at = NOW() \
             WHERE id = $1 AND status <> 'resolved' \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ReportRow>(&query)
            .bind(id)
            .bind(resolution.as_str())
            .bind(resolution.admin_response())
            .bind(admin_notes)
            .bind(admin_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?
            .map(Report::try_from)
            .transpose()
    }
}
