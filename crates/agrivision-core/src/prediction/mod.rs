//! Prediction domain module.
//!
//! - `model`: the `PredictionRecord` row as stored in the remote table
//! - `repository`: the read-only record access trait
//! - `feed`: row-level change events and the standing subscription trait

mod feed;
mod model;
mod repository;

pub use feed::{ChangeEvent, ChangeFeed, ChangeHandler, FeedHandle};
pub use model::PredictionRecord;
pub use repository::{PredictionRepository, RECENT_FETCH_LIMIT};
