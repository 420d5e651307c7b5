//! Diff types — the structured comparison of two ordered snapshots.
//!
//! Diffs are immutable once computed. At most one diff exists per
//! `(dataset_id, from_date, to_date)`; the store enforces this with a
//! UNIQUE constraint and callers check existence before computing.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ─── Metadata changes ────────────────────────────────────────────────────────

/// One tracked descriptive field that differs between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataChange {
  pub field: String,
  pub old:   Option<String>,
  pub new:   Option<String>,
}

impl fmt::Display for MetadataChange {
  /// Renders as `field: 'old' -> 'new'`. This rendered form is the
  /// serialized descriptor text the volatility flags are matched against.
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{}: '{}' -> '{}'",
      self.field,
      self.old.as_deref().unwrap_or(""),
      self.new.as_deref().unwrap_or(""),
    )
  }
}

// ─── Schema changes ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaChangeKind {
  Added,
  Removed,
  Retyped,
}

/// One column added, removed or retyped between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaChange {
  pub kind:      SchemaChangeKind,
  pub column:    String,
  pub from_type: Option<String>,
  pub to_type:   Option<String>,
}

// ─── Content changes ─────────────────────────────────────────────────────────

/// Row/column deltas plus the normalized content-drift ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentChanges {
  pub row_count_delta:    i64,
  pub column_count_delta: i64,
  /// 0 when the content hash is unchanged; otherwise in (0, 1], increasing
  /// with schema churn and relative size delta.
  pub content_drift:      f64,
}

// ─── Diff ────────────────────────────────────────────────────────────────────

/// The structured comparison of two snapshots of one dataset, with
/// `from_date < to_date`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diff {
  pub dataset_id:       String,
  pub from_date:        NaiveDate,
  pub to_date:          NaiveDate,
  pub metadata_changes: Vec<MetadataChange>,
  pub schema_changes:   Vec<SchemaChange>,
  pub content_changes:  ContentChanges,
  /// Composite change score in [0, 1].
  pub volatility_score: f64,
  /// Tagged strings summarizing notable transitions, e.g. "schema_shrink".
  pub change_events:    Vec<String>,
}
