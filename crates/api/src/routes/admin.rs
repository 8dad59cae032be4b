//! Route definitions for `/admin`. Every handler requires the admin role.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Routes mounted at `/admin`.
///
/// ```text
/// POST   /sessions/fix-status              -> fix_status_consistency
/// GET    /reports                          -> list_reports (?status=)
/// POST   /reports/{id}/open                -> open_report
/// POST   /reports/{id}/resolve             -> resolve_report
/// POST   /cancel-requests/{id}/resolve     -> resolve_dispute
/// GET    /users/{id}/standing              -> get_standing
/// POST   /users/{id}/block                 -> block_user
/// DELETE /users/{id}/block                 -> unblock_user
/// PUT    /users/{id}/suspension            -> suspend_user
/// DELETE /users/{id}/suspension            -> lift_suspension
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sessions/fix-status", post(admin::fix_status_consistency))
        .route("/reports", get(admin::list_reports))
        .route("/reports/{id}/open", post(admin::open_report))
        .route("/reports/{id}/resolve", post(admin::resolve_report))
        .route(
            "/cancel-requests/{id}/resolve",
            post(admin::resolve_dispute),
        )
        .route("/users/{id}/standing", get(admin::get_standing))
        .route(
            "/users/{id}/block",
            post(admin::block_user).delete(admin::unblock_user),
        )
        .route(
            "/users/{id}/suspension",
            put(admin::suspend_user).delete(admin::lift_suspension),
        )
}
