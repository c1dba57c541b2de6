//! Row-level change feed.
//!
//! Push notifications of inserts, updates, and deletes on the remote table.
//! Delivery order across events is not guaranteed to match commit order and
//! each event is delivered at least once; consumers that need consistency
//! resync rather than merging payloads.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::model::PredictionRecord;
use crate::error::SubscriptionError;

/// A row-level mutation observed on the remote table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum ChangeEvent {
    Insert { record: PredictionRecord },
    Update { record: PredictionRecord },
    Delete { id: String },
}

/// Callback invoked for every delivered change event.
pub type ChangeHandler = Arc<dyn Fn(ChangeEvent) + Send + Sync>;

/// Handle to a standing change subscription.
///
/// Exclusively owned by whoever opened the subscription; [`FeedHandle::close`]
/// releases it exactly once, and dropping the handle closes it as well. A
/// closed feed is never reopened through the same handle.
#[derive(Debug)]
pub struct FeedHandle {
    token: CancellationToken,
    closed: AtomicBool,
}

impl FeedHandle {
    /// Wraps the cancellation token driving the feed's delivery task.
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            closed: AtomicBool::new(false),
        }
    }

    /// Releases the subscription. Subsequent calls are no-ops.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.token.cancel();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// A publish/subscribe channel of row-level changes, keyed on table name.
///
/// A dropped or failed subscription is not retried by the feed itself; the
/// caller decides whether to re-subscribe (typically on remount).
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Opens a standing subscription to all event types on `table`.
    ///
    /// # Arguments
    ///
    /// * `table` - Logical table name, e.g. `"predictions"`
    /// * `handler` - Invoked once per delivered event
    ///
    /// # Errors
    ///
    /// Returns `SubscriptionError` if the subscription could not be opened.
    async fn watch(
        &self,
        table: &str,
        handler: ChangeHandler,
    ) -> Result<FeedHandle, SubscriptionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_releases_exactly_once() {
        let token = CancellationToken::new();
        let handle = FeedHandle::new(token.clone());

        assert!(!handle.is_closed());
        handle.close();
        assert!(handle.is_closed());
        assert!(token.is_cancelled());

        // second close is a no-op
        handle.close();
        assert!(handle.is_closed());
    }

    #[test]
    fn drop_cancels_the_feed() {
        let token = CancellationToken::new();
        drop(FeedHandle::new(token.clone()));
        assert!(token.is_cancelled());
    }

    #[test]
    fn change_event_wire_format() {
        let json = r#"{
            "type": "DELETE",
            "id": "7"
        }"#;
        let event: ChangeEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(event, ChangeEvent::Delete { ref id } if id == "7"));
    }
}
