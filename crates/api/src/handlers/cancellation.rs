//! Handlers for session cancellation requests.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use skillswap_core::cancellation::{CancelResponse, NewCancelRequest};
use skillswap_core::types::{CancelRequestId, SessionId};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for asking to cancel an active session.
#[derive(Debug, Deserialize)]
pub struct CreateCancelRequest {
    pub reason: String,
    pub description: Option<String>,
    #[serde(default)]
    pub evidence_files: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct RespondCancelRequest {
    /// `"agree"` or `"dispute"`.
    pub response: CancelResponse,
}

/// POST /api/v1/sessions/{id}/cancel-requests
pub async fn request_cancellation(
    user: AuthUser,
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
    Json(input): Json<CreateCancelRequest>,
) -> AppResult<impl IntoResponse> {
    let new_request = NewCancelRequest {
        session_id,
        initiator_id: user.user_id,
        reason: input.reason,
        description: input.description,
        evidence_files: input.evidence_files,
    };
    let request = state
        .services
        .cancellations
        .request_cancellation(&new_request)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: request })))
}

/// GET /api/v1/sessions/{id}/cancel-requests
pub async fn list_cancel_requests(
    user: AuthUser,
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
) -> AppResult<impl IntoResponse> {
    let requests = state
        .services
        .cancellations
        .list_cancel_requests(session_id, user.actor())
        .await?;
    Ok(Json(DataResponse { data: requests }))
}

/// POST /api/v1/cancel-requests/{id}/respond
///
/// Agreeing cancels the session; disputing hands it to an admin.
pub async fn respond_cancellation(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<CancelRequestId>,
    Json(input): Json<RespondCancelRequest>,
) -> AppResult<impl IntoResponse> {
    let outcome = state
        .services
        .cancellations
        .respond_cancellation(id, user.user_id, input.response)
        .await?;
    Ok(Json(DataResponse { data: outcome }))
}
