//! Domain core for the skill-swap platform.
//!
//! Holds the session, meeting, completion, cancellation, report, and user
//! standing lifecycles as plain types and validation rules, the repository
//! traits the storage layer implements, and the services that drive every
//! state transition.

pub mod cancellation;
pub mod completion;
pub mod error;
pub mod events;
pub mod meeting;
pub mod memory;
pub mod report;
pub mod repository;
pub mod roles;
pub mod services;
pub mod session;
pub mod standing;
pub mod types;
