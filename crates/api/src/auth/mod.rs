//! Authentication primitives.
//!
//! Users sign in through the wider platform; this service only verifies the
//! HS256 access tokens it issues ([`jwt`]).

pub mod jwt;
