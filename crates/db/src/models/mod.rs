//! Row types for every table, with conversion into domain types.

pub mod cancellation;
pub mod completion;
pub mod meeting;
pub mod report;
pub mod session;
pub mod standing;
