pub mod admin;
pub mod health;
pub mod meetings;
pub mod reports;
pub mod sessions;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /sessions                                   propose, list (?status=)
/// /sessions/{id}                              get
/// /sessions/{id}/accept                       accept (receiver)
/// /sessions/{id}/reject                       reject (receiver)
/// /sessions/{id}/completion-requests          request, list
/// /sessions/{id}/progress                     list, update (PUT)
/// /sessions/{id}/cancel-requests              request, list
/// /completion-requests/{id}/resolve           approve / reject
/// /cancel-requests/{id}/respond               agree / dispute
///
/// /meetings                                   propose, list
/// /meetings/{id}                              get
/// /meetings/{id}/respond                      accept / reject (receiver)
/// /meetings/{id}/cancel                       cancel
/// /meetings/{id}/acknowledge                  acknowledge cancellation
/// /meetings/{id}/complete                     complete
///
/// /reports                                    file
/// /reports/{id}                               get
///
/// /user/standing                              own standing
///
/// /admin/...                                  see routes::admin
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/sessions", sessions::router())
        .route(
            "/completion-requests/{id}/resolve",
            post(handlers::completion::resolve_completion_request),
        )
        .route(
            "/cancel-requests/{id}/respond",
            post(handlers::cancellation::respond_cancellation),
        )
        .nest("/meetings", meetings::router())
        .nest("/reports", reports::router())
        .route("/user/standing", get(handlers::standing::get_own_standing))
        .nest("/admin", admin::router())
}
