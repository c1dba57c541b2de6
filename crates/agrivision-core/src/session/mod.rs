//! Session domain module.
//!
//! Everything related to the authenticated identity of the current client:
//!
//! - `model`: the `Session` entity, credentials, and the `AuthState` machine
//! - `identity`: the `IdentityService` capability trait and its event feed

mod identity;
mod model;

pub use identity::{AuthEvent, IdentityService};
pub use model::{AuthState, Credentials, Session, UserIdentity};
