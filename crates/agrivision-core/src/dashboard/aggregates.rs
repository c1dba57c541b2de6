//! Pure aggregate derivations over the record sequence.
//!
//! These are recomputed from the raw records on every render; nothing here
//! is cached, so the presentation can never desync from the data.

use crate::prediction::PredictionRecord;

/// Arithmetic mean of yield over the full sequence, rounded to 2 decimals.
///
/// Returns `0.0` for an empty sequence.
pub fn average_yield(records: &[PredictionRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let sum: f64 = records.iter().map(|r| r.yield_tons_per_ha).sum();
    let mean = sum / records.len() as f64;
    (mean * 100.0).round() / 100.0
}

/// Count of records per distinct crop type, in first-seen order.
///
/// The counts always sum to `records.len()` and the keys cover exactly the
/// distinct `crop_type` values present.
pub fn crop_distribution(records: &[PredictionRecord]) -> Vec<(String, usize)> {
    let mut distribution: Vec<(String, usize)> = Vec::new();
    for record in records {
        match distribution.iter_mut().find(|(crop, _)| crop == &record.crop_type) {
            Some((_, count)) => *count += 1,
            None => distribution.push((record.crop_type.clone(), 1)),
        }
    }
    distribution
}

/// The most recent record: element 0 of the descending-sorted sequence.
pub fn latest(records: &[PredictionRecord]) -> Option<&PredictionRecord> {
    records.first()
}
