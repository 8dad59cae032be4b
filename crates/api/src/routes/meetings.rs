//! Route definitions for the `/meetings` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::meetings;
use crate::state::AppState;

/// Routes mounted at `/meetings`.
///
/// ```text
/// POST   /                   -> propose_meeting
/// GET    /                   -> list_meetings
/// GET    /{id}               -> get_meeting
/// POST   /{id}/respond       -> respond_meeting
/// POST   /{id}/cancel        -> cancel_meeting
/// POST   /{id}/acknowledge   -> acknowledge_cancellation
/// POST   /{id}/complete      -> complete_meeting
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(meetings::propose_meeting).get(meetings::list_meetings),
        )
        .route("/{id}", get(meetings::get_meeting))
        .route("/{id}/respond", post(meetings::respond_meeting))
        .route("/{id}/cancel", post(meetings::cancel_meeting))
        .route("/{id}/acknowledge", post(meetings::acknowledge_cancellation))
        .route("/{id}/complete", post(meetings::complete_meeting))
}
