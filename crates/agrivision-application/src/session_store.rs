//! Identity session store.
//!
//! Wraps the external identity service, owns the current [`AuthState`], and
//! notifies subscribers on every change. Sign-in and sign-out calls are
//! delegated to the service and do not mutate local state directly; the
//! listener task applies whatever arrives on the service's event feed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use agrivision_core::error::AuthError;
use agrivision_core::session::{AuthEvent, AuthState, Credentials, IdentityService, Session};

/// Observer callback invoked with the current session on every state change.
pub type SessionListener = Arc<dyn Fn(Option<&Session>) + Send + Sync>;

/// Owns the auth state machine for one client.
///
/// Lifecycle: [`SessionStore::bind`] once at mount, [`SessionStore::release`]
/// on teardown. Between the two, a listener task consumes the identity
/// service's event feed and is the only writer of the state.
pub struct SessionStore {
    identity: Arc<dyn IdentityService>,
    state: RwLock<AuthState>,
    listeners: Mutex<HashMap<u64, SessionListener>>,
    next_listener_id: AtomicU64,
    bind_token: Mutex<Option<CancellationToken>>,
}

impl SessionStore {
    pub fn new(identity: Arc<dyn IdentityService>) -> Self {
        Self {
            identity,
            state: RwLock::new(AuthState::Unknown),
            listeners: Mutex::new(HashMap::new()),
            next_listener_id: AtomicU64::new(0),
            bind_token: Mutex::new(None),
        }
    }

    /// Restores any existing session and starts listening for auth changes.
    ///
    /// Call exactly once at mount. The state leaves `Unknown` before this
    /// returns, so callers can gate protected views on the result of
    /// [`SessionStore::state`] immediately afterwards. A second call
    /// replaces the previous listener task.
    pub async fn bind(self: &Arc<Self>) {
        // Subscribe before restoring so no event between the two is lost.
        let events = self.identity.auth_events();

        let restored = self.identity.restore_session().await;
        tracing::debug!(restored = restored.is_some(), "session restore completed");
        self.apply_state(match restored {
            Some(session) => AuthState::Authenticated(session),
            None => AuthState::Anonymous,
        });

        let token = CancellationToken::new();
        if let Some(previous) = self.bind_token.lock().unwrap().replace(token.clone()) {
            previous.cancel();
        }
        self.spawn_listener(events, token);
    }

    fn spawn_listener(
        self: &Arc<Self>,
        mut events: broadcast::Receiver<AuthEvent>,
        token: CancellationToken,
    ) {
        let store = Arc::downgrade(self);
        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = token.cancelled() => break,
                    event = events.recv() => event,
                };
                let Some(store) = store.upgrade() else { break };
                match event {
                    Ok(event) => store.apply_event(event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "auth event receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    fn apply_event(&self, event: AuthEvent) {
        match event {
            AuthEvent::SignedIn(session) | AuthEvent::TokenRefreshed(session) => {
                self.apply_state(AuthState::Authenticated(session));
            }
            AuthEvent::SignedOut => self.apply_state(AuthState::Anonymous),
        }
    }

    fn apply_state(&self, next: AuthState) {
        {
            let mut state = self.state.write().unwrap();
            tracing::debug!(from = ?state_name(&state), to = ?state_name(&next), "auth transition");
            *state = next;
        }
        self.notify_listeners();
    }

    fn notify_listeners(&self) {
        // Snapshot under the lock, invoke outside it.
        let listeners: Vec<SessionListener> =
            self.listeners.lock().unwrap().values().cloned().collect();
        let state = self.state.read().unwrap().clone();
        for listener in listeners {
            listener(state.session());
        }
    }

    /// Registers an observer; it fires on every subsequent state change.
    ///
    /// The returned [`Subscription`] unsubscribes exactly once, on the first
    /// of `unsubscribe()` or drop.
    pub fn subscribe(self: &Arc<Self>, listener: SessionListener) -> Subscription {
        let id = self.next_listener_id.fetch_add(1, Ordering::SeqCst);
        self.listeners.lock().unwrap().insert(id, listener);
        Subscription {
            store: Arc::downgrade(self),
            id,
            released: AtomicBool::new(false),
        }
    }

    /// Current auth state snapshot.
    pub fn state(&self) -> AuthState {
        self.state.read().unwrap().clone()
    }

    /// Delegates to the identity service; the resulting state change
    /// arrives asynchronously through the event feed.
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        self.identity.sign_in(credentials).await
    }

    /// See [`SessionStore::sign_in`].
    pub async fn sign_up(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        self.identity.sign_up(credentials).await
    }

    /// See [`SessionStore::sign_in`].
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.identity.sign_out().await
    }

    /// Stops the listener task. No notifications are delivered afterwards.
    pub fn release(&self) {
        if let Some(token) = self.bind_token.lock().unwrap().take() {
            token.cancel();
        }
    }

    fn remove_listener(&self, id: u64) {
        self.listeners.lock().unwrap().remove(&id);
    }
}

fn state_name(state: &AuthState) -> &'static str {
    match state {
        AuthState::Unknown => "unknown",
        AuthState::Authenticated(_) => "authenticated",
        AuthState::Anonymous => "anonymous",
    }
}

/// Handle returned by [`SessionStore::subscribe`].
pub struct Subscription {
    store: Weak<SessionStore>,
    id: u64,
    released: AtomicBool,
}

impl Subscription {
    /// Removes the listener. Subsequent calls are no-ops.
    pub fn unsubscribe(&self) {
        if !self.released.swap(true, Ordering::SeqCst)
            && let Some(store) = self.store.upgrade()
        {
            store.remove_listener(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::mpsc;

    use agrivision_core::session::UserIdentity;

    struct MockIdentityService {
        restored: Option<Session>,
        events: broadcast::Sender<AuthEvent>,
    }

    impl MockIdentityService {
        fn new(restored: Option<Session>) -> Self {
            let (events, _) = broadcast::channel(16);
            Self { restored, events }
        }
    }

    #[async_trait]
    impl IdentityService for MockIdentityService {
        async fn restore_session(&self) -> Option<Session> {
            self.restored.clone()
        }

        async fn sign_in(&self, credentials: &Credentials) -> Result<Session, AuthError> {
            if credentials.password == "wrong" {
                return Err(AuthError::InvalidCredentials);
            }
            let session = session(&credentials.email);
            let _ = self.events.send(AuthEvent::SignedIn(session.clone()));
            Ok(session)
        }

        async fn sign_up(&self, credentials: &Credentials) -> Result<Session, AuthError> {
            self.sign_in(credentials).await
        }

        async fn sign_out(&self) -> Result<(), AuthError> {
            let _ = self.events.send(AuthEvent::SignedOut);
            Ok(())
        }

        fn auth_events(&self) -> broadcast::Receiver<AuthEvent> {
            self.events.subscribe()
        }
    }

    fn session(email: &str) -> Session {
        Session {
            user: UserIdentity {
                id: "user-1".to_string(),
                email: email.to_string(),
            },
            access_token: "token".to_string(),
            expires_at: None,
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn bind_moves_state_out_of_unknown() {
        let store = Arc::new(SessionStore::new(Arc::new(MockIdentityService::new(None))));
        assert!(store.state().is_unknown());

        store.bind().await;
        assert_eq!(store.state(), AuthState::Anonymous);
        store.release();
    }

    #[tokio::test]
    async fn bind_restores_an_existing_session() {
        let identity = MockIdentityService::new(Some(session("farmer@example.com")));
        let store = Arc::new(SessionStore::new(Arc::new(identity)));

        store.bind().await;
        assert!(store.state().is_authenticated());
        store.release();
    }

    #[tokio::test]
    async fn sign_in_state_arrives_through_the_event_feed() {
        let store = Arc::new(SessionStore::new(Arc::new(MockIdentityService::new(None))));
        store.bind().await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let _subscription = store.subscribe(Arc::new(move |session| {
            let _ = tx.send(session.map(|s| s.user.email.clone()));
        }));

        store
            .sign_in(&Credentials::new("farmer@example.com", "secret"))
            .await
            .unwrap();
        settle().await;

        assert!(store.state().is_authenticated());
        assert_eq!(
            rx.recv().await.unwrap(),
            Some("farmer@example.com".to_string())
        );
        store.release();
    }

    #[tokio::test]
    async fn sign_out_clears_to_anonymous_and_notifies() {
        let identity = MockIdentityService::new(Some(session("farmer@example.com")));
        let store = Arc::new(SessionStore::new(Arc::new(identity)));
        store.bind().await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let _subscription = store.subscribe(Arc::new(move |session| {
            let _ = tx.send(session.is_some());
        }));

        store.sign_out().await.unwrap();
        settle().await;

        assert_eq!(store.state(), AuthState::Anonymous);
        assert_eq!(rx.recv().await.unwrap(), false);
        store.release();
    }

    #[tokio::test]
    async fn invalid_credentials_surface_and_leave_state_alone() {
        let store = Arc::new(SessionStore::new(Arc::new(MockIdentityService::new(None))));
        store.bind().await;

        let err = store
            .sign_in(&Credentials::new("farmer@example.com", "wrong"))
            .await
            .unwrap_err();
        assert!(err.is_invalid_credentials());
        assert_eq!(store.state(), AuthState::Anonymous);
        store.release();
    }

    #[tokio::test]
    async fn unsubscribe_stops_notifications_exactly_once() {
        let store = Arc::new(SessionStore::new(Arc::new(MockIdentityService::new(None))));
        store.bind().await;

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let subscription = store.subscribe(Arc::new(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        }));

        store
            .sign_in(&Credentials::new("farmer@example.com", "secret"))
            .await
            .unwrap();
        settle().await;
        let after_first = calls.load(Ordering::SeqCst);
        assert!(after_first >= 1);

        subscription.unsubscribe();
        subscription.unsubscribe();

        store.sign_out().await.unwrap();
        settle().await;
        assert_eq!(calls.load(Ordering::SeqCst), after_first);
        store.release();
    }

    #[tokio::test]
    async fn released_store_stops_applying_events() {
        let identity = Arc::new(MockIdentityService::new(None));
        let store = Arc::new(SessionStore::new(identity.clone()));
        store.bind().await;
        store.release();

        let _ = identity
            .events
            .send(AuthEvent::SignedIn(session("late@example.com")));
        settle().await;

        assert_eq!(store.state(), AuthState::Anonymous);
    }
}
