pub mod admin;
pub mod cancellation;
pub mod completion;
pub mod meetings;
pub mod reports;
pub mod sessions;
pub mod standing;
