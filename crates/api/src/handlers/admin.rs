//! Admin-only handlers: consistency repair, report moderation, dispute
//! resolution, and user standing.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use skillswap_core::cancellation::CancelResolution;
use skillswap_core::report::{ReportResolution, ReportStatus};
use skillswap_core::types::{CancelRequestId, ReportId, Timestamp, UserId};

use crate::error::AppResult;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct FixStatusResponse {
    /// Rows whose stored status was rewritten.
    pub repaired: u64,
}

#[derive(Debug, Deserialize)]
pub struct ListReportsQuery {
    pub status: Option<ReportStatus>,
}

#[derive(Debug, Deserialize)]
pub struct ResolveReportRequest {
    pub resolution: ReportResolution,
    pub admin_notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResolveDisputeRequest {
    /// `"canceled"`, `"partial_completion"`, or `"continued"`.
    pub resolution: String,
    pub admin_notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SuspendUserRequest {
    pub until: Timestamp,
    pub reason: String,
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// POST /api/v1/admin/sessions/fix-status
///
/// Recompute every stored session status from its acceptance flag.
pub async fn fix_status_consistency(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let repaired = state
        .services
        .sessions
        .fix_status_consistency(admin.actor())
        .await?;
    Ok(Json(DataResponse {
        data: FixStatusResponse { repaired },
    }))
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/reports?status=
pub async fn list_reports(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<ListReportsQuery>,
) -> AppResult<impl IntoResponse> {
    let reports = state
        .services
        .reports
        .list_reports(admin.actor(), params.status)
        .await?;
    Ok(Json(DataResponse { data: reports }))
}

/// POST /api/v1/admin/reports/{id}/open
///
/// The first open moves the report under review; later opens return it
/// unchanged.
pub async fn open_report(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ReportId>,
) -> AppResult<impl IntoResponse> {
    let report = state.services.reports.open_report(id, admin.actor()).await?;
    Ok(Json(DataResponse { data: report }))
}

/// POST /api/v1/admin/reports/{id}/resolve
pub async fn resolve_report(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ReportId>,
    Json(input): Json<ResolveReportRequest>,
) -> AppResult<impl IntoResponse> {
    let report = state
        .services
        .reports
        .resolve_report(
            id,
            input.resolution,
            admin.actor(),
            input.admin_notes.as_deref(),
        )
        .await?;
    Ok(Json(DataResponse { data: report }))
}

// ---------------------------------------------------------------------------
// Disputes
// ---------------------------------------------------------------------------

/// POST /api/v1/admin/cancel-requests/{id}/resolve
pub async fn resolve_dispute(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<CancelRequestId>,
    Json(input): Json<ResolveDisputeRequest>,
) -> AppResult<impl IntoResponse> {
    let resolution = CancelResolution::parse_admin(&input.resolution)?;
    let outcome = state
        .services
        .cancellations
        .resolve_dispute(id, admin.actor(), resolution, input.admin_notes.as_deref())
        .await?;
    Ok(Json(DataResponse { data: outcome }))
}

// ---------------------------------------------------------------------------
// User standing
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/users/{id}/standing
pub async fn get_standing(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> AppResult<impl IntoResponse> {
    let standing = state.services.standing.get_standing(user_id).await?;
    Ok(Json(DataResponse { data: standing }))
}

/// POST /api/v1/admin/users/{id}/block
pub async fn block_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> AppResult<impl IntoResponse> {
    let standing = state
        .services
        .standing
        .block_user(admin.actor(), user_id)
        .await?;
    Ok(Json(DataResponse { data: standing }))
}

/// DELETE /api/v1/admin/users/{id}/block
pub async fn unblock_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> AppResult<impl IntoResponse> {
    let standing = state
        .services
        .standing
        .unblock_user(admin.actor(), user_id)
        .await?;
    Ok(Json(DataResponse { data: standing }))
}

/// PUT /api/v1/admin/users/{id}/suspension
pub async fn suspend_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Json(input): Json<SuspendUserRequest>,
) -> AppResult<impl IntoResponse> {
    let standing = state
        .services
        .standing
        .suspend_user(admin.actor(), user_id, input.until, &input.reason)
        .await?;
    Ok(Json(DataResponse { data: standing }))
}

/// DELETE /api/v1/admin/users/{id}/suspension
pub async fn lift_suspension(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> AppResult<impl IntoResponse> {
    let standing = state
        .services
        .standing
        .lift_suspension(admin.actor(), user_id)
        .await?;
    Ok(Json(DataResponse { data: standing }))
}
