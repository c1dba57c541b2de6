//! Core domain layer for the AgriVision dashboard.
//!
//! This crate defines the domain models, the error taxonomy, and the
//! capability traits the rest of the workspace is wired against:
//!
//! - [`session`]: authenticated identity state and the [`session::IdentityService`] capability
//! - [`prediction`]: prediction records, the read repository, and the change feed
//! - [`dashboard`]: dashboard view state and pure aggregate derivation
//!
//! No I/O happens here; concrete transports live in `agrivision-infrastructure`.

pub mod dashboard;
pub mod error;
pub mod prediction;
pub mod session;

pub use error::{AuthError, FetchError, SubscriptionError};
