//! Lifecycle event fan-out.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`; the services' notification sink.
//! - [`PlatformEvent`]: the event envelope carried on the bus.
//! - [`EventPersistence`]: background task that writes every event to
//!   `platform_events`.

pub mod bus;
pub mod persistence;

pub use bus::{EventBus, PlatformEvent};
pub use persistence::EventPersistence;
