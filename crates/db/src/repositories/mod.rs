//! PostgreSQL implementations of the core repository traits.
//!
//! Every state change is a conditional `UPDATE ... WHERE <expected state>`
//! so concurrent writers resolve to a single winner; a miss comes back as
//! `Ok(None)`.

pub mod cancel_request_repo;
pub mod completion_repo;
pub mod event_repo;
pub mod meeting_repo;
pub mod progress_repo;
pub mod report_repo;
pub mod session_repo;
pub mod standing_repo;

use std::sync::Arc;

use skillswap_core::repository::Repositories;

pub use cancel_request_repo::PgCancelRequestRepo;
pub use completion_repo::PgCompletionRepo;
pub use event_repo::EventRepo;
pub use meeting_repo::PgMeetingRepo;
pub use progress_repo::PgProgressRepo;
pub use report_repo::PgReportRepo;
pub use session_repo::PgSessionRepo;
pub use standing_repo::PgStandingRepo;

use crate::DbPool;

/// Build the full repository set over one pool.
pub fn pg_repositories(pool: &DbPool) -> Repositories {
    Repositories {
        sessions: Arc::new(PgSessionRepo::new(pool.clone())),
        completions: Arc::new(PgCompletionRepo::new(pool.clone())),
        progress: Arc::new(PgProgressRepo::new(pool.clone())),
        cancellations: Arc::new(PgCancelRequestRepo::new(pool.clone())),
        meetings: Arc::new(PgMeetingRepo::new(pool.clone())),
        reports: Arc::new(PgReportRepo::new(pool.clone())),
        standings: Arc::new(PgStandingRepo::new(pool.clone())),
    }
}
