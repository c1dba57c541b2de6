//! Session domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque identity of the signed-in user as reported by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Server-assigned opaque user id
    pub id: String,
    /// Email the user signed in with
    pub email: String,
}

/// Authenticated identity state for the current client.
///
/// Created on successful sign-in/sign-up or restored from the identity
/// service at startup; destroyed on sign-out or token expiry. Owned
/// exclusively by the session store; everyone else receives clones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user: UserIdentity,
    /// Bearer token presented on authenticated requests
    pub access_token: String,
    /// Expiry reported by the identity service, if any
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Whether the session's token has passed its reported expiry.
    ///
    /// A session without a reported expiry never expires locally; the
    /// identity service remains the authority either way.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Credentials submitted to sign-in and sign-up.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Authentication state machine.
///
/// `Unknown -> {Authenticated, Anonymous}` after session restore,
/// `Authenticated -> Anonymous` on sign-out or expiry,
/// `Anonymous -> Authenticated` on sign-in. No other transitions.
///
/// Consumers must not render protected views while the state is `Unknown`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AuthState {
    /// Startup state, before session restore has completed
    #[default]
    Unknown,
    /// A valid session exists
    Authenticated(Session),
    /// No session; the sign-in surface should be shown
    Anonymous,
}

impl AuthState {
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// Returns the current session, if authenticated.
    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::Authenticated(session) => Some(session),
            _ => None,
        }
    }
}
