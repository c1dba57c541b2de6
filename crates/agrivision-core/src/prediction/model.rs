//! Prediction record domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One stored crop-yield prediction row.
///
/// Records are immutable in this client's view: the dashboard only reads
/// them and observes external changes through the change feed. The remote
/// column for the yield value is named `yield`, which is a Rust keyword,
/// hence the serde rename.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    /// Server-assigned unique id
    pub id: String,
    /// Predicted crop, e.g. "Wheat"
    pub crop_type: String,
    /// Predicted yield in tons per hectare, non-negative
    #[serde(rename = "yield")]
    pub yield_tons_per_ha: f64,
    /// Model confidence in [0, 1]
    pub confidence: f64,
    /// Server-side creation timestamp
    pub created_at: DateTime<Utc>,
}

impl PredictionRecord {
    /// Confidence as a display percentage, e.g. `87.5`.
    pub fn confidence_percent(&self) -> f64 {
        self.confidence * 100.0
    }
}
