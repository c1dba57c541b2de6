//! Long-poll implementation of the change feed.
//!
//! The backend exposes a cursor-based changes endpoint: each request blocks
//! server-side until events exist past the cursor or the poll deadline
//! passes (204). Delivery is at least once and not ordered by commit;
//! consumers resync instead of merging payloads, so both properties are
//! acceptable. Transient errors are retried with a fixed backoff until the
//! handle is closed; the feed never re-subscribes on behalf of the caller.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use agrivision_core::error::SubscriptionError;
use agrivision_core::prediction::{ChangeEvent, ChangeFeed, ChangeHandler, FeedHandle};

use crate::config::BackendConfig;

const RETRY_BACKOFF: Duration = Duration::from_secs(3);

#[derive(Debug, Deserialize)]
struct ChangeBatch {
    cursor: u64,
    events: Vec<ChangeEvent>,
}

/// Change feed backed by the backend's long-poll changes endpoint.
pub struct PollChangeFeed {
    client: Client,
    changes_url: String,
    anon_key: String,
    poll_timeout: Duration,
}

impl PollChangeFeed {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            client: Client::new(),
            changes_url: config.changes_url(),
            anon_key: config.anon_key.clone(),
            poll_timeout: Duration::from_secs(config.poll_timeout_secs),
        }
    }

    async fn poll_once(&self, table: &str, cursor: u64) -> Result<Option<ChangeBatch>, String> {
        let url = format!("{}/{}", self.changes_url, table);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("cursor", cursor.to_string()),
                ("timeout", self.poll_timeout.as_secs().to_string()),
            ])
            .header("apikey", &self.anon_key)
            // The request deadline leaves headroom over the server-side poll window.
            .timeout(self.poll_timeout + Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        match response.status() {
            StatusCode::NO_CONTENT => Ok(None),
            status if status.is_success() => response
                .json::<ChangeBatch>()
                .await
                .map(Some)
                .map_err(|e| format!("bad change batch: {e}")),
            status => Err(format!("changes endpoint answered {status}")),
        }
    }
}

#[async_trait]
impl ChangeFeed for PollChangeFeed {
    async fn watch(
        &self,
        table: &str,
        handler: ChangeHandler,
    ) -> Result<FeedHandle, SubscriptionError> {
        // Establish the starting cursor before handing out the handle, so a
        // watch against an unreachable backend fails fast instead of
        // spinning silently.
        let initial = self
            .poll_once(table, 0)
            .await
            .map_err(SubscriptionError::dropped)?;
        let mut cursor = initial.as_ref().map(|b| b.cursor).unwrap_or(0);

        let token = CancellationToken::new();
        let task_token = token.clone();
        let client = Self {
            client: self.client.clone(),
            changes_url: self.changes_url.clone(),
            anon_key: self.anon_key.clone(),
            poll_timeout: self.poll_timeout,
        };
        let table = table.to_string();

        tokio::spawn(async move {
            if let Some(batch) = initial {
                for event in batch.events {
                    handler(event);
                }
            }

            loop {
                let poll = tokio::select! {
                    _ = task_token.cancelled() => break,
                    poll = client.poll_once(&table, cursor) => poll,
                };

                match poll {
                    Ok(Some(batch)) => {
                        cursor = cursor.max(batch.cursor);
                        for event in batch.events {
                            handler(event);
                        }
                    }
                    Ok(None) => {}
                    Err(message) => {
                        tracing::warn!(table = %table, %message, "change poll failed, retrying");
                        tokio::select! {
                            _ = task_token.cancelled() => break,
                            _ = tokio::time::sleep(RETRY_BACKOFF) => {}
                        }
                    }
                }
            }
            tracing::debug!(table = %table, "change feed released");
        });

        Ok(FeedHandle::new(token))
    }
}
