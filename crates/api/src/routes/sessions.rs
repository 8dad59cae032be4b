//! Route definitions for the `/sessions` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{cancellation, completion, sessions};
use crate::state::AppState;

/// Routes mounted at `/sessions`.
///
/// ```text
/// POST   /                            -> propose_session
/// GET    /                            -> list_sessions (?status=)
/// GET    /{id}                        -> get_session
/// POST   /{id}/accept                 -> accept_session
/// POST   /{id}/reject                 -> reject_session
/// POST   /{id}/completion-requests    -> request_completion
/// GET    /{id}/completion-requests    -> list_completion_requests
/// GET    /{id}/progress               -> list_progress
/// PUT    /{id}/progress               -> update_progress
/// POST   /{id}/cancel-requests        -> request_cancellation
/// GET    /{id}/cancel-requests        -> list_cancel_requests
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(sessions::propose_session).get(sessions::list_sessions),
        )
        .route("/{id}", get(sessions::get_session))
        .route("/{id}/accept", post(sessions::accept_session))
        .route("/{id}/reject", post(sessions::reject_session))
        .route(
            "/{id}/completion-requests",
            post(completion::request_completion).get(completion::list_completion_requests),
        )
        .route(
            "/{id}/progress",
            get(completion::list_progress).put(completion::update_progress),
        )
        .route(
            "/{id}/cancel-requests",
            post(cancellation::request_cancellation).get(cancellation::list_cancel_requests),
        )
}
