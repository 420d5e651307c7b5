//! Dataset identity — the thin envelope that snapshots attach to.
//!
//! A dataset record holds only catalog metadata. All observed state lives in
//! its snapshot history.

use serde::{Deserialize, Serialize};

/// Whether a dataset's remote content could be retrieved at observation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
  Available,
  Unavailable,
  Unknown,
}

/// A catalog entry for one externally hosted dataset.
///
/// Identity is owned by the external catalog; `dataset_id` is its opaque
/// string key. Records are immutable from this crate's point of view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetRecord {
  pub dataset_id:      String,
  pub url:             String,
  /// Format label as declared by the catalog (e.g. "CSV", "json").
  /// Interpreted case-insensitively by the analyzer; may be absent.
  pub declared_format: Option<String>,
  pub agency:          Option<String>,
  pub title:           Option<String>,
}
