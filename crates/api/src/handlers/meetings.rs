//! Handlers for the `/meetings` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use skillswap_core::meeting::{MeetingDecision, NewMeeting};
use skillswap_core::types::{MeetingId, Timestamp, UserId};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for proposing a meeting. The caller is the sender.
#[derive(Debug, Deserialize)]
pub struct ProposeMeetingRequest {
    pub receiver_id: UserId,
    pub description: String,
    pub meeting_time: Timestamp,
    pub meeting_link: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RespondMeetingRequest {
    /// `"accept"` or `"reject"`.
    pub decision: MeetingDecision,
}

#[derive(Debug, Deserialize)]
pub struct CancelMeetingRequest {
    pub reason: String,
}

/// POST /api/v1/meetings
pub async fn propose_meeting(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<ProposeMeetingRequest>,
) -> AppResult<impl IntoResponse> {
    state.services.standing.ensure_can_initiate(user.user_id).await?;

    let new_meeting = NewMeeting {
        sender_id: user.user_id,
        receiver_id: input.receiver_id,
        description: input.description,
        meeting_time: input.meeting_time,
        meeting_link: input.meeting_link,
    };
    let meeting = state.services.meetings.propose_meeting(&new_meeting).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: meeting })))
}

/// GET /api/v1/meetings
///
/// Meetings the caller sent or received, by meeting time.
pub async fn list_meetings(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let meetings = state.services.meetings.list_meetings(user.user_id).await?;
    Ok(Json(DataResponse { data: meetings }))
}

/// GET /api/v1/meetings/{id}
pub async fn get_meeting(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<MeetingId>,
) -> AppResult<impl IntoResponse> {
    let meeting = state.services.meetings.get_meeting(id, user.actor()).await?;
    Ok(Json(DataResponse { data: meeting }))
}

/// POST /api/v1/meetings/{id}/respond
pub async fn respond_meeting(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<MeetingId>,
    Json(input): Json<RespondMeetingRequest>,
) -> AppResult<impl IntoResponse> {
    let meeting = state
        .services
        .meetings
        .respond_meeting(id, user.user_id, input.decision)
        .await?;
    Ok(Json(DataResponse { data: meeting }))
}

/// POST /api/v1/meetings/{id}/cancel
pub async fn cancel_meeting(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<MeetingId>,
    Json(input): Json<CancelMeetingRequest>,
) -> AppResult<impl IntoResponse> {
    let cancelled = state
        .services
        .meetings
        .cancel_meeting(id, user.user_id, &input.reason)
        .await?;
    Ok(Json(DataResponse { data: cancelled }))
}

/// POST /api/v1/meetings/{id}/acknowledge
pub async fn acknowledge_cancellation(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<MeetingId>,
) -> AppResult<impl IntoResponse> {
    let record = state
        .services
        .meetings
        .acknowledge_cancellation(id, user.user_id)
        .await?;
    Ok(Json(DataResponse { data: record }))
}

/// POST /api/v1/meetings/{id}/complete
pub async fn complete_meeting(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<MeetingId>,
) -> AppResult<impl IntoResponse> {
    let meeting = state
        .services
        .meetings
        .complete_meeting(id, user.user_id)
        .await?;
    Ok(Json(DataResponse { data: meeting }))
}
