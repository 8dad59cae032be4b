//! Handlers for the `/sessions` resource: propose, view, accept, reject.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use skillswap_core::session::{NewSession, SessionStatus};
use skillswap_core::types::{SessionId, SkillId, Timestamp, UserId};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for proposing a session. The caller is the proposer.
#[derive(Debug, Deserialize)]
pub struct ProposeSessionRequest {
    pub skill1_id: SkillId,
    pub description_of_service1: String,
    pub user2_id: UserId,
    pub skill2_id: SkillId,
    pub description_of_service2: String,
    pub start_date: Timestamp,
    #[serde(default)]
    pub expected_end_date: Option<Timestamp>,
}

#[derive(Debug, Deserialize)]
pub struct ListSessionsQuery {
    pub status: Option<SessionStatus>,
}

/// POST /api/v1/sessions
///
/// Blocked or suspended users cannot propose. Returns 429 once the caller
/// has three pending proposals to the same receiver.
pub async fn propose_session(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<ProposeSessionRequest>,
) -> AppResult<impl IntoResponse> {
    state.services.standing.ensure_can_initiate(user.user_id).await?;

    let new_session = NewSession {
        user1_id: user.user_id,
        skill1_id: input.skill1_id,
        description_of_service1: input.description_of_service1,
        user2_id: input.user2_id,
        skill2_id: input.skill2_id,
        description_of_service2: input.description_of_service2,
        start_date: input.start_date,
        expected_end_date: input.expected_end_date,
    };
    let session = state.services.sessions.propose_session(&new_session).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: session })))
}

/// GET /api/v1/sessions?status=
///
/// Sessions where the caller is either party.
pub async fn list_sessions(
    user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ListSessionsQuery>,
) -> AppResult<impl IntoResponse> {
    let sessions = state
        .services
        .sessions
        .list_sessions(user.user_id, params.status)
        .await?;
    Ok(Json(DataResponse { data: sessions }))
}

/// GET /api/v1/sessions/{id}
pub async fn get_session(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> AppResult<impl IntoResponse> {
    let session = state.services.sessions.get_session(id, user.actor()).await?;
    Ok(Json(DataResponse { data: session }))
}

/// POST /api/v1/sessions/{id}/accept
pub async fn accept_session(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> AppResult<impl IntoResponse> {
    let session = state.services.sessions.accept_session(id, user.user_id).await?;
    Ok(Json(DataResponse { data: session }))
}

/// POST /api/v1/sessions/{id}/reject
///
/// Rejecting an already-rejected session returns it unchanged.
pub async fn reject_session(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> AppResult<impl IntoResponse> {
    let session = state.services.sessions.reject_session(id, user.user_id).await?;
    Ok(Json(DataResponse { data: session }))
}
