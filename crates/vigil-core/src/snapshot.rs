//! Snapshot types — one timestamped observation of a dataset.
//!
//! Snapshots are append-only and totally ordered per dataset by
//! `snapshot_date`. The *current* snapshot is the one with the maximum
//! `created_at`; it is the only snapshot whose dimension fields may be
//! back-filled after creation.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ─── Schema contract ─────────────────────────────────────────────────────────

/// The serialized schema record consumed by downstream detail views.
///
/// This encoding is a durable contract: `columns` is the ordered column name
/// list, `dtypes` maps column name to an inferred type name, and
/// `sample_data` holds at most three sample records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaInfo {
  pub columns:     Vec<String>,
  #[serde(default)]
  pub dtypes:      BTreeMap<String, String>,
  #[serde(default)]
  pub sample_data: Vec<serde_json::Value>,
  /// Shape marker for JSON content: "array", "object" or "primitive".
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub structure:   Option<String>,
  /// Diagnostic captured during analysis (fallback engaged, HTTP status,
  /// unsupported format). Never treated as an error by consumers.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub note:        Option<String>,
}

impl SchemaInfo {
  /// A schema record carrying only a diagnostic note.
  pub fn note_only(note: impl Into<String>) -> Self {
    Self {
      note: Some(note.into()),
      ..Self::default()
    }
  }
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// One observation of a dataset at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
  pub dataset_id:    String,
  pub snapshot_date: NaiveDate,
  /// Insertion timestamp, assigned by the catalog sync that created the row.
  /// Last-write-wins ordering within a dataset's history.
  pub created_at:    DateTime<Utc>,

  // Structural dimensions; absent until the dimension pass back-fills them.
  pub row_count:     Option<i64>,
  pub column_count:  Option<i64>,
  pub file_size:     Option<i64>,
  pub content_hash:  Option<String>,
  pub schema:        Option<SchemaInfo>,

  // Observation metadata.
  pub availability:  crate::dataset::Availability,
  pub status_code:   Option<u16>,
  pub last_modified: Option<String>,

  // Tracked descriptive fields compared by the diff engine.
  pub url:           Option<String>,
  pub title:         Option<String>,
  pub agency:        Option<String>,
  pub license:       Option<String>,
  pub publisher:     Option<String>,
}

impl Snapshot {
  /// Ordered column names of this snapshot's schema (empty when absent).
  pub fn columns(&self) -> &[String] {
    self.schema.as_ref().map(|s| s.columns.as_slice()).unwrap_or(&[])
  }

  /// Inferred datatype for `column`, if the schema records one.
  pub fn dtype(&self, column: &str) -> Option<&str> {
    self
      .schema
      .as_ref()
      .and_then(|s| s.dtypes.get(column))
      .map(String::as_str)
  }
}

// ─── Computation result ──────────────────────────────────────────────────────

/// Transient output of content analysis.
///
/// Never persisted as its own record; merged into the current snapshot at the
/// persistence boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationResult {
  pub row_count:    i64,
  pub column_count: i64,
  pub file_size:    i64,
  /// Hex-encoded SHA-256 of the exact raw bytes; empty when no content was
  /// retrieved (e.g. an HTTP error body we chose not to fingerprint).
  pub content_hash: String,
  pub schema_info:  Option<SchemaInfo>,
  pub analyzed_at:  DateTime<Utc>,
}

impl ComputationResult {
  /// A zero-dimension result carrying a diagnostic note — used for non-2xx
  /// responses, which are a successful fetch but yield no content to analyze.
  pub fn unavailable(note: impl Into<String>) -> Self {
    Self {
      row_count:    0,
      column_count: 0,
      file_size:    0,
      content_hash: String::new(),
      schema_info:  Some(SchemaInfo::note_only(note)),
      analyzed_at:  Utc::now(),
    }
  }
}
