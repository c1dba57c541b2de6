//! Identity service capability trait.
//!
//! Defines the interface to the external identity provider. Implementations
//! wrap the remote auth endpoints; the session store consumes this trait and
//! never talks to the network itself.

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::model::{Credentials, Session};
use crate::error::AuthError;

/// Auth change notifications published by an [`IdentityService`].
///
/// Sign-in, sign-out, and token refresh results reach observers through this
/// feed; the service's own methods do not mutate observer-visible state.
#[derive(Debug, Clone)]
pub enum AuthEvent {
    /// A session was established (sign-in or sign-up).
    SignedIn(Session),
    /// The session ended (explicit sign-out or detected expiry).
    SignedOut,
    /// The session's token was refreshed in place.
    TokenRefreshed(Session),
}

/// An abstract identity provider.
///
/// This trait decouples the session store from the concrete auth transport
/// (REST service, in-memory double for tests).
///
/// # Implementation Notes
///
/// Implementations must publish every state change on the [`AuthEvent`]
/// feed, including changes caused by their own `sign_in`/`sign_out` calls.
/// Observers treat the feed as the single source of truth.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Queries the identity service for an existing valid session at startup.
    ///
    /// # Returns
    ///
    /// `Some(Session)` if a valid session exists, `None` otherwise. Any
    /// transport error is treated as "no session" and must not propagate.
    async fn restore_session(&self) -> Option<Session>;

    /// Authenticates with email and password.
    ///
    /// # Errors
    ///
    /// - `AuthError::InvalidCredentials`: the service rejected the credentials
    /// - `AuthError::Network`: transport failure
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, AuthError>;

    /// Registers a new account and signs it in.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`IdentityService::sign_in`].
    async fn sign_up(&self, credentials: &Credentials) -> Result<Session, AuthError>;

    /// Ends the current session.
    ///
    /// # Errors
    ///
    /// Returns an error if the service could not be reached; the local
    /// session is considered ended regardless (a `SignedOut` event is
    /// published either way).
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Subscribes to the auth change-notification feed.
    ///
    /// Each call returns a fresh receiver; events published before the call
    /// are not replayed.
    fn auth_events(&self) -> broadcast::Receiver<AuthEvent>;
}
