//! Error types for the AgriVision client.

use thiserror::Error;

/// Errors surfaced by the identity service.
///
/// These reach the sign-in/sign-up flow and are shown to the user; none of
/// them is fatal to the process.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    /// The identity service rejected the supplied credentials.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Transport-level failure talking to the identity service.
    #[error("auth network error: {message}")]
    Network { message: String },

    /// The stored session token is no longer valid.
    #[error("session token expired")]
    ExpiredToken,

    /// The identity service answered with an unexpected status or body.
    #[error("identity service error: {0}")]
    Service(String),
}

impl AuthError {
    /// Creates a Network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates a Service error.
    pub fn service(message: impl Into<String>) -> Self {
        Self::Service(message.into())
    }

    /// Check if this error means the user should re-enter credentials.
    pub fn is_invalid_credentials(&self) -> bool {
        matches!(self, Self::InvalidCredentials)
    }
}

/// Errors raised by record reads.
///
/// Controllers log these and keep the previous record set visible; they are
/// never allowed to blank the view.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Transport-level failure.
    #[error("fetch network error: {message}")]
    Network { message: String },

    /// The request did not complete within the configured deadline.
    #[error("fetch timed out")]
    Timeout,

    /// The response arrived but could not be decoded.
    #[error("malformed response: {message}")]
    MalformedResponse { message: String },
}

impl FetchError {
    /// Creates a Network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates a MalformedResponse error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    /// Check if this is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

/// Errors raised by the change-feed subscription.
///
/// Logged only: a dropped feed means the view silently stops receiving
/// realtime updates until the next manual refresh or remount.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubscriptionError {
    /// The standing connection to the change feed was lost.
    #[error("change feed connection dropped: {message}")]
    ConnectionDropped { message: String },

    /// The subscription handle was already closed.
    #[error("subscription closed")]
    Closed,
}

impl SubscriptionError {
    /// Creates a ConnectionDropped error.
    pub fn dropped(message: impl Into<String>) -> Self {
        Self::ConnectionDropped {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_error_display() {
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            "invalid email or password"
        );
        assert!(AuthError::network("dns failure").to_string().contains("dns"));
        assert!(AuthError::InvalidCredentials.is_invalid_credentials());
        assert!(!AuthError::ExpiredToken.is_invalid_credentials());
    }

    #[test]
    fn fetch_error_predicates() {
        assert!(FetchError::Timeout.is_timeout());
        assert!(!FetchError::network("refused").is_timeout());
    }
}
