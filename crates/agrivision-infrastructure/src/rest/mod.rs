//! REST clients for the hosted backend.
//!
//! - `predictions`: filtered/ordered/limited reads of the prediction table
//! - `identity`: credential auth against the backend's identity endpoints

mod identity;
mod predictions;

pub use identity::RestIdentityService;
pub use predictions::RestPredictionRepository;

use std::time::Duration;

use agrivision_core::error::FetchError;

/// Per-request deadline for plain REST calls.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Maps a transport error onto the fetch taxonomy.
pub(crate) fn fetch_transport_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else if err.is_decode() {
        FetchError::malformed(err.to_string())
    } else {
        FetchError::network(err.to_string())
    }
}
