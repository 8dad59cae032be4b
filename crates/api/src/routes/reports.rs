//! Route definitions for the `/reports` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::reports;
use crate::state::AppState;

/// Routes mounted at `/reports`.
///
/// ```text
/// POST   /       -> file_report
/// GET    /{id}   -> get_report
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(reports::file_report))
        .route("/{id}", get(reports::get_report))
}
