//! REST implementation of the prediction repository.

use async_trait::async_trait;
use reqwest::Client;
use std::sync::RwLock;

use agrivision_core::error::FetchError;
use agrivision_core::prediction::{PredictionRecord, PredictionRepository};

use super::{REQUEST_TIMEOUT, fetch_transport_error};
use crate::config::BackendConfig;

/// Reads prediction rows through the backend's REST interface.
///
/// Queries are filtered server-side (`order=created_at.desc&limit=n`); the
/// result is re-sorted and truncated locally as well, so the ordering and
/// cap invariants hold even against a misbehaving backend.
pub struct RestPredictionRepository {
    client: Client,
    rest_url: String,
    table: String,
    anon_key: String,
    /// User token for authenticated reads; the anon key is used until set.
    access_token: RwLock<Option<String>>,
}

impl RestPredictionRepository {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            client: Client::new(),
            rest_url: config.rest_url(),
            table: config.table.clone(),
            anon_key: config.anon_key.clone(),
            access_token: RwLock::new(None),
        }
    }

    /// Sets or clears the bearer token used for subsequent reads.
    pub fn set_access_token(&self, token: Option<String>) {
        *self.access_token.write().unwrap() = token;
    }

    fn bearer(&self) -> String {
        self.access_token
            .read()
            .unwrap()
            .clone()
            .unwrap_or_else(|| self.anon_key.clone())
    }

    /// Issues a minimal one-row read to verify the backend is reachable.
    ///
    /// # Errors
    ///
    /// Returns the same taxonomy as `fetch_recent`; callers typically log a
    /// warning and continue.
    pub async fn probe(&self) -> Result<(), FetchError> {
        self.fetch_recent(1).await.map(|_| ())
    }
}

#[async_trait]
impl PredictionRepository for RestPredictionRepository {
    async fn fetch_recent(&self, limit: usize) -> Result<Vec<PredictionRecord>, FetchError> {
        let url = format!("{}/{}", self.rest_url, self.table);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("select", "*"),
                ("order", "created_at.desc"),
                ("limit", &limit.to_string()),
            ])
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", self.bearer()))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(fetch_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::network(format!(
                "record query failed ({status}): {body}"
            )));
        }

        let mut records = response
            .json::<Vec<PredictionRecord>>()
            .await
            .map_err(|e| FetchError::malformed(e.to_string()))?;

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit);
        Ok(records)
    }
}
