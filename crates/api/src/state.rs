use std::sync::Arc;

use skillswap_core::services::Services;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone: everything inside is behind `Arc` or already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Database pool, absent when running on the in-memory store.
    pub pool: Option<skillswap_db::DbPool>,
    pub config: Arc<ServerConfig>,
    /// Lifecycle services over whichever store is configured.
    pub services: Services,
    /// Event bus the services publish lifecycle events to.
    pub event_bus: Arc<skillswap_events::EventBus>,
}
