//! Prediction repository trait.
//!
//! Defines the read-only interface to the remote `predictions` table.

use async_trait::async_trait;

use super::model::PredictionRecord;
use crate::error::FetchError;

/// The dashboard always works on the most recent records, capped here.
pub const RECENT_FETCH_LIMIT: usize = 50;

/// Read access to stored prediction records.
///
/// The client never writes to the table; rows appear and disappear through
/// external producers and are observed via the change feed.
#[async_trait]
pub trait PredictionRepository: Send + Sync {
    /// Fetches the most recent records.
    ///
    /// # Arguments
    ///
    /// * `limit` - Maximum number of rows to return
    ///
    /// # Returns
    ///
    /// Records ordered by `created_at` descending, at most `limit` of them.
    /// An empty result is valid and must not be treated as an error.
    ///
    /// # Errors
    ///
    /// - `FetchError::Network` / `FetchError::Timeout`: transport failure
    /// - `FetchError::MalformedResponse`: the body could not be decoded
    async fn fetch_recent(&self, limit: usize) -> Result<Vec<PredictionRecord>, FetchError>;
}
