//! The caller's own moderation standing.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/user/standing
pub async fn get_own_standing(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let standing = state.services.standing.get_standing(user.user_id).await?;
    Ok(Json(DataResponse { data: standing }))
}
