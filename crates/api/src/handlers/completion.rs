//! Handlers for completion requests and progress tracking.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use skillswap_core::completion::{CompletionDecision, ProgressStatus};
use skillswap_core::types::{CompletionRequestId, SessionId, UserId};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for approving or rejecting a completion request.
#[derive(Debug, Deserialize)]
pub struct ResolveCompletionRequest {
    /// `"approved"` or `"rejected"`.
    pub decision: String,
    /// Required when rejecting.
    pub rejection_reason: Option<String>,
}

/// Request body for a progress update.
#[derive(Debug, Deserialize)]
pub struct UpdateProgressRequest {
    /// Whose progress this is. Defaults to the caller; only admins may set
    /// someone else's.
    pub user_id: Option<UserId>,
    pub completion_percentage: i32,
    pub status: Option<ProgressStatus>,
    pub notes: Option<String>,
}

// ---------------------------------------------------------------------------
// Completion requests
// ---------------------------------------------------------------------------

/// POST /api/v1/sessions/{id}/completion-requests
pub async fn request_completion(
    user: AuthUser,
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
) -> AppResult<impl IntoResponse> {
    let request = state
        .services
        .completion
        .request_completion(session_id, user.actor())
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: request })))
}

/// GET /api/v1/sessions/{id}/completion-requests
pub async fn list_completion_requests(
    user: AuthUser,
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
) -> AppResult<impl IntoResponse> {
    let requests = state
        .services
        .completion
        .list_completion_requests(session_id, user.actor())
        .await?;
    Ok(Json(DataResponse { data: requests }))
}

/// POST /api/v1/completion-requests/{id}/resolve
///
/// Returns the decided request and the session as it stands afterwards.
pub async fn resolve_completion_request(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<CompletionRequestId>,
    Json(input): Json<ResolveCompletionRequest>,
) -> AppResult<impl IntoResponse> {
    let decision = CompletionDecision::parse(&input.decision, input.rejection_reason.as_deref())?;
    let outcome = state
        .services
        .completion
        .resolve_completion_request(id, decision, user.actor())
        .await?;
    Ok(Json(DataResponse { data: outcome }))
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// GET /api/v1/sessions/{id}/progress
pub async fn list_progress(
    user: AuthUser,
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
) -> AppResult<impl IntoResponse> {
    let progress = state
        .services
        .completion
        .list_progress(session_id, user.actor())
        .await?;
    Ok(Json(DataResponse { data: progress }))
}

/// PUT /api/v1/sessions/{id}/progress
pub async fn update_progress(
    user: AuthUser,
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
    Json(input): Json<UpdateProgressRequest>,
) -> AppResult<impl IntoResponse> {
    let progress = state
        .services
        .completion
        .update_progress(
            user.actor(),
            session_id,
            input.user_id.unwrap_or(user.user_id),
            input.completion_percentage,
            input.status,
            input.notes,
        )
        .await?;
    Ok(Json(DataResponse { data: progress }))
}
