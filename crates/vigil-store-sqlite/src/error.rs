//! Error type for `vigil-store-sqlite`.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("column decode error: {0}")]
  Decode(String),

  /// Attempted to back-fill dimensions for a dataset with no snapshots.
  #[error("dataset {0} has no snapshots")]
  NoSnapshots(String),

  /// A diff already exists for this snapshot pair.
  #[error("diff already stored for {dataset_id} {from_date}..{to_date}")]
  DuplicateDiff {
    dataset_id: String,
    from_date:  NaiveDate,
    to_date:    NaiveDate,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
