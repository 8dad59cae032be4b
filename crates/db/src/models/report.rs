//! Report rows (`session_reports`).

use skillswap_core::error::CoreError;
use skillswap_core::report::{Report, ReportResolution, ReportStatus};
use skillswap_core::types::{DbId, Timestamp};
use sqlx::FromRow;

use crate::corrupt_column;

const TABLE: &str = "session_reports";

/// A row from the `session_reports` table.
#[derive(Debug, Clone, FromRow)]
pub struct ReportRow {
    pub id: DbId,
    pub reported_by: DbId,
    pub reported_user: DbId,
    pub session_id: DbId,
    pub reason: String,
    pub description: Option<String>,
    pub status: String,
    pub resolution: Option<String>,
    pub admin_response: Option<String>,
    pub admin_notes: Option<String>,
    pub reviewed_by: Option<DbId>,
    pub opened_at: Option<Timestamp>,
    pub resolved_by: Option<DbId>,
    pub resolved_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<ReportRow> for Report {
    type Error = CoreError;

    fn try_from(row: ReportRow) -> Result<Self, Self::Error> {
        let resolution = row
            .resolution
            .as_deref()
            .map(ReportResolution::parse)
            .transpose()
            .map_err(|e| corrupt_column(TABLE, "resolution", e))?;
        Ok(Report {
            id: row.id,
            reported_by: row.reported_by,
            reported_user: row.reported_user,
            session_id: row.session_id,
            reason: row.reason,
            description: row.description,
            status: ReportStatus::parse(&row.status)
                .map_err(|e| corrupt_column(TABLE, "status", e))?,
            resolution,
            admin_response: row.admin_response,
            admin_notes: row.admin_notes,
            reviewed_by: row.reviewed_by,
            opened_at: row.opened_at,
            resolved_by: row.resolved_by,
            resolved_at: row.resolved_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn resolved_row_converts() {
        let row = ReportRow {
            id: 1,
            reported_by: 1,
            reported_user: 2,
            session_id: 3,
            reason: "No-show".into(),
            description: None,
            status: "resolved".into(),
            resolution: Some("warn_reported".into()),
            admin_response: Some(ReportResolution::WarnReported.admin_response().into()),
            admin_notes: None,
            reviewed_by: Some(9),
            opened_at: Some(Utc::now()),
            resolved_by: Some(9),
            resolved_at: Some(Utc::now()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let report = Report::try_from(row).unwrap();
        assert_eq!(report.status, ReportStatus::Resolved);
        assert_eq!(report.resolution, Some(ReportResolution::WarnReported));
    }
}
