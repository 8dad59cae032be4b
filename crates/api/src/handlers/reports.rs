//! Handlers for filing and viewing in-session reports.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use skillswap_core::report::NewReport;
use skillswap_core::types::{ReportId, SessionId, UserId};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for filing a report. The caller is the reporter.
#[derive(Debug, Deserialize)]
pub struct FileReportRequest {
    pub reported_user: UserId,
    pub session_id: SessionId,
    pub reason: String,
    pub description: Option<String>,
}

/// POST /api/v1/reports
pub async fn file_report(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<FileReportRequest>,
) -> AppResult<impl IntoResponse> {
    let new_report = NewReport {
        reported_by: user.user_id,
        reported_user: input.reported_user,
        session_id: input.session_id,
        reason: input.reason,
        description: input.description,
    };
    let report = state.services.reports.file_report(&new_report).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: report })))
}

/// GET /api/v1/reports/{id}
///
/// Visible to the reporter and to admins.
pub async fn get_report(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<ReportId>,
) -> AppResult<impl IntoResponse> {
    let report = state.services.reports.get_report(id, user.actor()).await?;
    Ok(Json(DataResponse { data: report }))
}
