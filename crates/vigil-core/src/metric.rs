//! Per-snapshot volatility metrics derived from a diff.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One row per `(dataset_id, snapshot_date)`, derived deterministically from
/// its source [`Diff`](crate::diff::Diff). Recomputing from the same diff
/// must produce an identical record; the store upserts on the key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilityMetric {
  pub dataset_id:         String,
  /// The `to_date` of the source diff.
  pub snapshot_date:      NaiveDate,
  pub volatility_score:   f64,
  pub schema_churn_rate:  f64,
  /// `1 - content_drift` of the source diff.
  pub content_similarity: f64,
  pub license_changed:    bool,
  pub url_changed:        bool,
  pub publisher_changed:  bool,
  pub row_count_delta:    i64,
  pub column_count_delta: i64,
  pub change_events:      Vec<String>,
}
