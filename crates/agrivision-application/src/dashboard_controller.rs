//! Dashboard view-state controller.
//!
//! The single synchronization point between the change feed and the rendered
//! view. Every change event triggers a full resync of the recent-record set
//! rather than an incremental merge; reconciling unordered, at-least-once
//! push payloads against local state is not worth the extra round-trips this
//! costs.
//!
//! Two guards keep async completions honest:
//!
//! - a monotonically increasing fetch sequence number; a completion is only
//!   applied if no higher-numbered completion has been applied yet, so a
//!   late-resolving earlier fetch can never overwrite a newer result
//! - a liveness flag flipped by [`DashboardController::unmount`]; completions
//!   arriving after teardown are discarded without touching state

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use agrivision_core::dashboard::{DashboardTab, DashboardViewState};
use agrivision_core::prediction::{
    ChangeEvent, ChangeFeed, ChangeHandler, FeedHandle, PredictionRepository,
};

pub struct DashboardController {
    repository: Arc<dyn PredictionRepository>,
    feed: Arc<dyn ChangeFeed>,
    table: String,
    fetch_limit: usize,
    state: RwLock<DashboardViewState>,
    /// Liveness token: cleared on unmount, checked before applying results.
    alive: AtomicBool,
    /// Next fetch sequence number to hand out.
    fetch_seq: AtomicU64,
    /// Highest sequence number whose completion has been applied.
    applied_seq: AtomicU64,
    feed_handle: Mutex<Option<FeedHandle>>,
}

impl DashboardController {
    pub fn new(
        repository: Arc<dyn PredictionRepository>,
        feed: Arc<dyn ChangeFeed>,
        table: impl Into<String>,
        fetch_limit: usize,
    ) -> Self {
        Self {
            repository,
            feed,
            table: table.into(),
            fetch_limit,
            state: RwLock::new(DashboardViewState::default()),
            alive: AtomicBool::new(true),
            fetch_seq: AtomicU64::new(0),
            applied_seq: AtomicU64::new(0),
            feed_handle: Mutex::new(None),
        }
    }

    /// Performs the initial fetch and opens the change subscription.
    ///
    /// A fetch failure here is logged and swallowed (the view starts empty);
    /// a subscription failure is logged and leaves the view without realtime
    /// updates until remount. Remounting closes any previous subscription
    /// before opening the new one.
    pub async fn mount(self: &Arc<Self>) {
        self.alive.store(true, Ordering::SeqCst);
        self.close_feed();

        self.resync().await;

        let weak = Arc::downgrade(self);
        let handler: ChangeHandler = Arc::new(move |event| {
            if let Some(controller) = weak.upgrade() {
                controller.on_change_event(event);
            }
        });

        match self.feed.watch(&self.table, handler).await {
            Ok(handle) => {
                *self.feed_handle.lock().unwrap() = Some(handle);
                tracing::debug!(table = %self.table, "change subscription opened");
            }
            Err(err) => {
                tracing::error!(error = %err, "change subscription failed; realtime updates disabled");
            }
        }
    }

    /// Reacts to a row-level change: the payload is ignored and the full
    /// record set is re-fetched.
    pub fn on_change_event(self: &Arc<Self>, _event: ChangeEvent) {
        if !self.alive.load(Ordering::SeqCst) {
            return;
        }
        self.state.write().unwrap().notifications += 1;

        let controller = Arc::clone(self);
        tokio::spawn(async move {
            controller.resync().await;
        });
    }

    /// Fetches the recent record set and applies it, subject to the
    /// sequence and liveness gates.
    ///
    /// On failure the previous records stay in place and the error is
    /// logged; the loading flag still settles to `false`.
    pub async fn resync(&self) {
        if !self.alive.load(Ordering::SeqCst) {
            return;
        }
        let seq = self.fetch_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.write().unwrap().loading = true;

        let result = self.repository.fetch_recent(self.fetch_limit).await;

        if !self.alive.load(Ordering::SeqCst) {
            tracing::debug!(seq, "discarding fetch completion after unmount");
            return;
        }

        let mut state = self.state.write().unwrap();
        // Highest sequence number wins; a stale completion changes nothing,
        // not even the loading flag, which is owned by the newest fetch.
        if seq <= self.applied_seq.load(Ordering::SeqCst) {
            tracing::debug!(seq, "discarding superseded fetch completion");
            return;
        }
        self.applied_seq.store(seq, Ordering::SeqCst);

        match result {
            Ok(records) => {
                tracing::debug!(seq, count = records.len(), "record set replaced");
                state.records = records;
            }
            Err(err) => {
                tracing::warn!(seq, error = %err, "record fetch failed, keeping previous set");
            }
        }
        state.loading = false;
    }

    /// Pure state transition, no I/O.
    pub fn select_tab(&self, tab: DashboardTab) {
        self.state.write().unwrap().selected_tab = tab;
    }

    /// View-state clone for rendering.
    pub fn snapshot(&self) -> DashboardViewState {
        self.state.read().unwrap().clone()
    }

    /// Closes the change subscription and stops all state mutation.
    ///
    /// Idempotent; any fetch completion resolving after this call is
    /// discarded via the liveness flag.
    pub fn unmount(&self) {
        self.alive.store(false, Ordering::SeqCst);
        self.close_feed();
    }

    fn close_feed(&self) {
        if let Some(handle) = self.feed_handle.lock().unwrap().take() {
            handle.close();
        }
    }
}

impl Drop for DashboardController {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::oneshot;
    use tokio_util::sync::CancellationToken;

    use agrivision_core::error::{FetchError, SubscriptionError};
    use agrivision_core::prediction::PredictionRecord;

    fn record(id: &str, crop: &str, minutes_ago: i64) -> PredictionRecord {
        PredictionRecord {
            id: id.to_string(),
            crop_type: crop.to_string(),
            yield_tons_per_ha: 30.0,
            confidence: 0.9,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
                - chrono::Duration::minutes(minutes_ago),
        }
    }

    /// Repository that pops one scripted result per call; once the script
    /// runs out it answers with an empty set.
    struct ScriptedRepository {
        results: Mutex<VecDeque<Result<Vec<PredictionRecord>, FetchError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedRepository {
        fn new(results: Vec<Result<Vec<PredictionRecord>, FetchError>>) -> Self {
            Self {
                results: Mutex::new(results.into()),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PredictionRepository for ScriptedRepository {
        async fn fetch_recent(
            &self,
            _limit: usize,
        ) -> Result<Vec<PredictionRecord>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(Vec::new()))
        }
    }

    /// Repository whose calls block until the test releases them, so
    /// completion order can be forced.
    struct GatedRepository {
        gates: Mutex<VecDeque<oneshot::Receiver<Result<Vec<PredictionRecord>, FetchError>>>>,
    }

    impl GatedRepository {
        fn new(calls: usize) -> (Self, Vec<oneshot::Sender<Result<Vec<PredictionRecord>, FetchError>>>) {
            let mut gates = VecDeque::new();
            let mut senders = Vec::new();
            for _ in 0..calls {
                let (tx, rx) = oneshot::channel();
                gates.push_back(rx);
                senders.push(tx);
            }
            (
                Self {
                    gates: Mutex::new(gates),
                },
                senders,
            )
        }
    }

    #[async_trait]
    impl PredictionRepository for GatedRepository {
        async fn fetch_recent(
            &self,
            _limit: usize,
        ) -> Result<Vec<PredictionRecord>, FetchError> {
            let gate = self.gates.lock().unwrap().pop_front();
            match gate {
                Some(gate) => gate.await.expect("test dropped the gate sender"),
                None => Ok(Vec::new()),
            }
        }
    }

    /// Feed that captures the handler so tests can fire events manually.
    #[derive(Default)]
    struct ManualFeed {
        handler: Mutex<Option<ChangeHandler>>,
        token: Mutex<Option<CancellationToken>>,
    }

    impl ManualFeed {
        fn fire(&self, event: ChangeEvent) {
            let handler = self.handler.lock().unwrap().clone();
            handler.expect("no watch registered")(event);
        }

        fn watch_token(&self) -> CancellationToken {
            self.token.lock().unwrap().clone().expect("no watch registered")
        }
    }

    #[async_trait]
    impl ChangeFeed for ManualFeed {
        async fn watch(
            &self,
            _table: &str,
            handler: ChangeHandler,
        ) -> Result<FeedHandle, SubscriptionError> {
            *self.handler.lock().unwrap() = Some(handler);
            let token = CancellationToken::new();
            *self.token.lock().unwrap() = Some(token.clone());
            Ok(FeedHandle::new(token))
        }
    }

    fn controller(
        repository: Arc<dyn PredictionRepository>,
        feed: Arc<dyn ChangeFeed>,
    ) -> Arc<DashboardController> {
        Arc::new(DashboardController::new(repository, feed, "predictions", 50))
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn mount_fetches_and_clears_loading() {
        let repository = Arc::new(ScriptedRepository::new(vec![Ok(vec![
            record("1", "Wheat", 0),
            record("2", "Maize", 5),
        ])]));
        let controller = controller(repository.clone(), Arc::new(ManualFeed::default()));

        controller.mount().await;

        let state = controller.snapshot();
        assert_eq!(state.records.len(), 2);
        assert!(!state.loading);
        assert_eq!(repository.calls(), 1);
        controller.unmount();
    }

    #[tokio::test]
    async fn empty_fetch_is_a_valid_result() {
        let repository = Arc::new(ScriptedRepository::new(vec![Ok(Vec::new())]));
        let controller = controller(repository, Arc::new(ManualFeed::default()));

        controller.mount().await;

        let state = controller.snapshot();
        assert!(state.records.is_empty());
        assert!(!state.loading);
        assert!(agrivision_core::dashboard::latest(&state.records).is_none());
        assert_eq!(agrivision_core::dashboard::average_yield(&state.records), 0.0);
        controller.unmount();
    }

    #[tokio::test]
    async fn failed_resync_keeps_previous_records() {
        let repository = Arc::new(ScriptedRepository::new(vec![
            Ok(vec![record("1", "Wheat", 0)]),
            Err(FetchError::Timeout),
        ]));
        let controller = controller(repository, Arc::new(ManualFeed::default()));

        controller.mount().await;
        controller.resync().await;

        let state = controller.snapshot();
        assert_eq!(state.records.len(), 1);
        assert_eq!(state.records[0].id, "1");
        assert!(!state.loading);
        controller.unmount();
    }

    #[tokio::test]
    async fn change_event_triggers_a_full_resync() {
        let repository = Arc::new(ScriptedRepository::new(vec![
            Ok(Vec::new()),
            Ok(vec![record("1", "Wheat", 0)]),
        ]));
        let feed = Arc::new(ManualFeed::default());
        let controller = controller(repository.clone(), feed.clone());

        controller.mount().await;
        feed.fire(ChangeEvent::Delete {
            id: "whatever".to_string(),
        });
        settle().await;

        let state = controller.snapshot();
        assert_eq!(repository.calls(), 2);
        assert_eq!(state.records.len(), 1);
        assert_eq!(state.notifications, 1);
        controller.unmount();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn late_completion_of_an_earlier_fetch_is_discarded() {
        let (repository, mut senders) = GatedRepository::new(2);
        let repository = Arc::new(repository);
        let controller = controller(repository, Arc::new(ManualFeed::default()));
        let second_gate = senders.pop().unwrap();
        let first_gate = senders.pop().unwrap();

        let first = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.resync().await })
        };
        settle().await;
        let second = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.resync().await })
        };
        settle().await;

        // Fetch #2 resolves first and wins.
        second_gate
            .send(Ok(vec![record("newer", "Maize", 0)]))
            .unwrap();
        second.await.unwrap();
        assert_eq!(controller.snapshot().records[0].id, "newer");

        // Fetch #1 resolves late and must be discarded.
        first_gate
            .send(Ok(vec![record("older", "Wheat", 0)]))
            .unwrap();
        first.await.unwrap();

        let state = controller.snapshot();
        assert_eq!(state.records.len(), 1);
        assert_eq!(state.records[0].id, "newer");
        assert!(!state.loading);
        controller.unmount();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn no_state_mutation_after_unmount() {
        let (repository, mut senders) = GatedRepository::new(1);
        let controller = controller(Arc::new(repository), Arc::new(ManualFeed::default()));
        let gate = senders.pop().unwrap();

        let in_flight = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.resync().await })
        };
        settle().await;

        controller.unmount();
        let before = controller.snapshot();

        gate.send(Ok(vec![record("late", "Rice", 0)])).unwrap();
        in_flight.await.unwrap();

        let after = controller.snapshot();
        assert_eq!(after.records, before.records);
        assert!(after.records.is_empty());
    }

    #[tokio::test]
    async fn unmount_closes_the_subscription_exactly_once() {
        let feed = Arc::new(ManualFeed::default());
        let controller = controller(
            Arc::new(ScriptedRepository::new(Vec::new())),
            feed.clone(),
        );

        controller.mount().await;
        let token = feed.watch_token();
        assert!(!token.is_cancelled());

        controller.unmount();
        assert!(token.is_cancelled());

        // second unmount is a no-op
        controller.unmount();
    }

    #[tokio::test]
    async fn events_after_unmount_are_ignored() {
        let repository = Arc::new(ScriptedRepository::new(Vec::new()));
        let feed = Arc::new(ManualFeed::default());
        let controller = controller(repository.clone(), feed.clone());

        controller.mount().await;
        controller.unmount();

        feed.fire(ChangeEvent::Delete {
            id: "x".to_string(),
        });
        settle().await;

        assert_eq!(repository.calls(), 1);
        assert_eq!(controller.snapshot().notifications, 0);
    }

    #[tokio::test]
    async fn select_tab_is_pure() {
        let repository = Arc::new(ScriptedRepository::new(Vec::new()));
        let controller = controller(repository.clone(), Arc::new(ManualFeed::default()));

        controller.select_tab(DashboardTab::Map);
        assert_eq!(controller.snapshot().selected_tab, DashboardTab::Map);
        assert_eq!(repository.calls(), 0);
    }

    #[tokio::test]
    async fn remount_replaces_the_previous_subscription() {
        let feed = Arc::new(ManualFeed::default());
        let controller = controller(
            Arc::new(ScriptedRepository::new(Vec::new())),
            feed.clone(),
        );

        controller.mount().await;
        let first_token = feed.watch_token();

        controller.mount().await;
        assert!(first_token.is_cancelled());
        assert!(!feed.watch_token().is_cancelled());
        controller.unmount();
    }
}
