//! REST implementation of the identity service.
//!
//! Talks to the backend's auth endpoints: password-grant token exchange,
//! signup, logout, and current-user lookup for session restore. State
//! changes are published on a broadcast feed; observers never read the
//! internal session cache directly.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::RwLock;
use tokio::sync::broadcast;

use agrivision_core::error::AuthError;
use agrivision_core::session::{AuthEvent, Credentials, IdentityService, Session, UserIdentity};

use super::REQUEST_TIMEOUT;
use crate::config::BackendConfig;

const AUTH_EVENT_CAPACITY: usize = 16;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
    user: UserResponse,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    email: String,
}

/// Identity service backed by the hosted auth endpoints.
pub struct RestIdentityService {
    client: Client,
    auth_url: String,
    anon_key: String,
    /// Current session token, in-memory only (no local persistence).
    session: RwLock<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
}

impl RestIdentityService {
    pub fn new(config: &BackendConfig) -> Self {
        let (events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);
        Self {
            client: Client::new(),
            auth_url: config.auth_url(),
            anon_key: config.anon_key.clone(),
            session: RwLock::new(None),
            events,
        }
    }

    /// Current session snapshot, if one is held.
    pub fn current_session(&self) -> Option<Session> {
        self.session.read().unwrap().clone()
    }

    fn store_session(&self, session: Session) {
        *self.session.write().unwrap() = Some(session.clone());
        let _ = self.events.send(AuthEvent::SignedIn(session));
    }

    fn clear_session(&self) {
        let had_session = self.session.write().unwrap().take().is_some();
        if had_session {
            let _ = self.events.send(AuthEvent::SignedOut);
        }
    }

    fn session_from_token(&self, token: TokenResponse) -> Session {
        Session {
            user: UserIdentity {
                id: token.user.id,
                email: token.user.email,
            },
            access_token: token.access_token,
            expires_at: token.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)),
        }
    }

    async fn token_request(
        &self,
        path: &str,
        query: &[(&str, &str)],
        credentials: &Credentials,
    ) -> Result<Session, AuthError> {
        let url = format!("{}{}", self.auth_url, path);

        let response = self
            .client
            .post(&url)
            .query(query)
            .header("apikey", &self.anon_key)
            .json(credentials)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| AuthError::network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            return Err(AuthError::InvalidCredentials);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::service(format!("{status}: {body}")));
        }

        let token = response
            .json::<TokenResponse>()
            .await
            .map_err(|e| AuthError::service(format!("bad token response: {e}")))?;

        let session = self.session_from_token(token);
        self.store_session(session.clone());
        Ok(session)
    }
}

#[async_trait]
impl IdentityService for RestIdentityService {
    async fn restore_session(&self) -> Option<Session> {
        let held = self.current_session()?;

        if held.is_expired(Utc::now()) {
            tracing::debug!("held session is past its expiry, discarding");
            self.clear_session();
            return None;
        }

        // Revalidate the token against the user endpoint.
        let url = format!("{}/user", self.auth_url);
        let response = self
            .client
            .get(&url)
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", held.access_token))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await;

        match response {
            Ok(response) if response.status() == StatusCode::UNAUTHORIZED => {
                tracing::debug!("identity service rejected the held token");
                self.clear_session();
                None
            }
            Ok(response) if response.status().is_success() => Some(held),
            Ok(response) => {
                tracing::debug!(status = %response.status(), "unexpected restore response");
                None
            }
            Err(err) => {
                // Transport errors are treated as "no session".
                tracing::debug!(error = %err, "session restore failed");
                None
            }
        }
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        self.token_request("/token", &[("grant_type", "password")], credentials)
            .await
    }

    async fn sign_up(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        self.token_request("/signup", &[], credentials).await
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let token = self.current_session().map(|s| s.access_token);

        // The local session ends regardless of what the service says.
        self.clear_session();

        let Some(token) = token else {
            return Ok(());
        };

        let url = format!("{}/logout", self.auth_url);
        let response = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {token}"))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| AuthError::network(e.to_string()))?;

        if !response.status().is_success() && response.status() != StatusCode::UNAUTHORIZED {
            return Err(AuthError::service(format!(
                "logout failed: {}",
                response.status()
            )));
        }
        Ok(())
    }

    fn auth_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> RestIdentityService {
        let config = BackendConfig {
            base_url: "https://farm.example.co".to_string(),
            anon_key: "anon".to_string(),
            table: "predictions".to_string(),
            schema: "public".to_string(),
            fetch_limit: 50,
            poll_timeout_secs: 25,
        };
        RestIdentityService::new(&config)
    }

    #[tokio::test]
    async fn restore_without_a_held_session_is_none() {
        let service = service();
        assert!(service.restore_session().await.is_none());
    }

    #[tokio::test]
    async fn expired_session_is_discarded_and_published() {
        let service = service();
        let mut events = service.auth_events();

        *service.session.write().unwrap() = Some(Session {
            user: UserIdentity {
                id: "u1".to_string(),
                email: "farmer@example.com".to_string(),
            },
            access_token: "stale".to_string(),
            expires_at: Some(Utc::now() - Duration::hours(1)),
        });

        assert!(service.restore_session().await.is_none());
        assert!(service.current_session().is_none());
        assert!(matches!(events.try_recv(), Ok(AuthEvent::SignedOut)));
    }

    #[tokio::test]
    async fn sign_out_without_session_is_quiet() {
        let service = service();
        let mut events = service.auth_events();

        service.sign_out().await.unwrap();
        assert!(events.try_recv().is_err());
    }
}
