//! In-process backend double.
//!
//! Implements both the prediction repository and the change feed over a
//! plain in-memory store. Used by unit tests across the workspace and by
//! the binary's `--demo` mode, where a seeding task keeps inserting
//! randomized records so the realtime path can be exercised without a
//! hosted backend.

use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use agrivision_core::error::{AuthError, FetchError};
use agrivision_core::prediction::{
    ChangeEvent, ChangeFeed, ChangeHandler, FeedHandle, PredictionRecord, PredictionRepository,
};
use agrivision_core::session::{AuthEvent, Credentials, IdentityService, Session, UserIdentity};

const EVENT_CAPACITY: usize = 64;

const DEMO_CROPS: [&str; 4] = ["Wheat", "Maize", "Rice", "Soybean"];

/// Shared in-memory record store with a change broadcast.
pub struct InMemoryBackend {
    records: Mutex<Vec<PredictionRecord>>,
    events: broadcast::Sender<ChangeEvent>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            records: Mutex::new(Vec::new()),
            events,
        }
    }

    /// A backend pre-populated with a plausible spread of demo records.
    pub fn with_demo_data() -> Self {
        let backend = Self::new();
        let mut rng = rand::thread_rng();
        {
            let mut records = backend.records.lock().unwrap();
            for i in 0..12 {
                records.push(demo_record(&mut rng, i));
            }
        }
        backend
    }

    /// Inserts a record and publishes the corresponding change event.
    pub fn insert(&self, record: PredictionRecord) {
        self.records.lock().unwrap().push(record.clone());
        let _ = self.events.send(ChangeEvent::Insert { record });
    }

    /// Removes a record by id and publishes a delete event if it existed.
    pub fn remove(&self, id: &str) {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() < before {
            drop(records);
            let _ = self.events.send(ChangeEvent::Delete { id: id.to_string() });
        }
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().unwrap().is_empty()
    }

    /// Spawns a task inserting one randomized record per `interval`.
    ///
    /// Returns a token; cancel it to stop the seeder.
    pub fn spawn_demo_seeder(self: &Arc<Self>, interval: Duration) -> CancellationToken {
        let token = CancellationToken::new();
        let task_token = token.clone();
        let backend = Arc::clone(self);

        tokio::spawn(async move {
            let mut sequence = backend.len() as u64;
            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
                sequence += 1;
                let record = demo_record(&mut rand::thread_rng(), sequence as i64);
                tracing::debug!(id = %record.id, crop = %record.crop_type, "demo insert");
                backend.insert(PredictionRecord {
                    created_at: Utc::now(),
                    ..record
                });
            }
        });

        token
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn demo_record(rng: &mut impl Rng, sequence: i64) -> PredictionRecord {
    PredictionRecord {
        id: uuid::Uuid::new_v4().to_string(),
        crop_type: DEMO_CROPS[rng.gen_range(0..DEMO_CROPS.len())].to_string(),
        yield_tons_per_ha: rng.gen_range(18.0..40.0),
        confidence: rng.gen_range(0.40..0.99),
        created_at: Utc::now() - chrono::Duration::minutes(sequence * 7),
    }
}

#[async_trait]
impl PredictionRepository for InMemoryBackend {
    async fn fetch_recent(&self, limit: usize) -> Result<Vec<PredictionRecord>, FetchError> {
        let mut records = self.records.lock().unwrap().clone();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit);
        Ok(records)
    }
}

#[async_trait]
impl ChangeFeed for InMemoryBackend {
    async fn watch(
        &self,
        _table: &str,
        handler: ChangeHandler,
    ) -> Result<FeedHandle, agrivision_core::error::SubscriptionError> {
        let mut receiver = self.events.subscribe();
        let token = CancellationToken::new();
        let task_token = token.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    received = receiver.recv() => match received {
                        Ok(event) => handler(event),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "change receiver lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
        });

        Ok(FeedHandle::new(token))
    }
}

/// Identity double that accepts any credentials.
///
/// `demo()` starts with a session already held, so demo mode lands on the
/// dashboard without a sign-in round-trip; `new()` starts signed out.
pub struct InMemoryIdentityService {
    session: RwLock<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
}

impl InMemoryIdentityService {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            session: RwLock::new(None),
            events,
        }
    }

    pub fn demo() -> Self {
        let service = Self::new();
        *service.session.write().unwrap() = Some(demo_session("demo@agrivision.local"));
        service
    }
}

impl Default for InMemoryIdentityService {
    fn default() -> Self {
        Self::new()
    }
}

fn demo_session(email: &str) -> Session {
    Session {
        user: UserIdentity {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
        },
        access_token: uuid::Uuid::new_v4().to_string(),
        expires_at: None,
    }
}

#[async_trait]
impl IdentityService for InMemoryIdentityService {
    async fn restore_session(&self) -> Option<Session> {
        self.session.read().unwrap().clone()
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        let session = demo_session(&credentials.email);
        *self.session.write().unwrap() = Some(session.clone());
        let _ = self.events.send(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        self.sign_in(credentials).await
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if self.session.write().unwrap().take().is_some() {
            let _ = self.events.send(AuthEvent::SignedOut);
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
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn record(id: &str, minutes_ago: i64) -> PredictionRecord {
        PredictionRecord {
            id: id.to_string(),
            crop_type: "Wheat".to_string(),
            yield_tons_per_ha: 30.0,
            confidence: 0.9,
            created_at: Utc::now() - chrono::Duration::minutes(minutes_ago),
        }
    }

    #[tokio::test]
    async fn fetch_recent_orders_and_caps() {
        let backend = InMemoryBackend::new();
        for i in 0..60 {
            backend.insert(record(&format!("r{i}"), 60 - i));
        }

        let records = backend.fetch_recent(50).await.unwrap();
        assert_eq!(records.len(), 50);
        assert!(records.windows(2).all(|w| w[0].created_at >= w[1].created_at));
        // newest first
        assert_eq!(records[0].id, "r59");
    }

    #[tokio::test]
    async fn empty_fetch_is_ok() {
        let backend = InMemoryBackend::new();
        let records = backend.fetch_recent(50).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn watch_delivers_insert_and_delete_events() {
        let backend = InMemoryBackend::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = Arc::clone(&seen);

        let handle = backend
            .watch(
                "predictions",
                Arc::new(move |_event| {
                    seen_clone.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .await
            .unwrap();

        backend.insert(record("a", 0));
        backend.remove("a");

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(seen.load(Ordering::SeqCst), 2);

        handle.close();
        backend.insert(record("b", 0));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn remove_of_unknown_id_publishes_nothing() {
        let backend = InMemoryBackend::new();
        let mut receiver = backend.events.subscribe();
        backend.remove("ghost");
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn demo_identity_restores_a_session() {
        let identity = InMemoryIdentityService::demo();
        let restored = identity.restore_session().await.unwrap();
        assert_eq!(restored.user.email, "demo@agrivision.local");
    }

    #[tokio::test]
    async fn identity_publishes_sign_in_and_out() {
        let identity = InMemoryIdentityService::new();
        let mut events = identity.auth_events();
        assert!(identity.restore_session().await.is_none());

        identity
            .sign_in(&Credentials::new("farmer@example.com", "pw"))
            .await
            .unwrap();
        assert!(matches!(events.try_recv(), Ok(AuthEvent::SignedIn(_))));

        identity.sign_out().await.unwrap();
        assert!(matches!(events.try_recv(), Ok(AuthEvent::SignedOut)));
    }
}
