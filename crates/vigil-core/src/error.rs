//! Error types for `vigil-core`.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("dataset not found: {0}")]
  DatasetNotFound(String),

  #[error("dataset {0} has no snapshots")]
  NoSnapshots(String),

  #[error("cannot diff snapshots of different datasets: {0} vs {1}")]
  DatasetMismatch(String, String),

  #[error("snapshots out of order: {from} is not before {to}")]
  SnapshotOrder { from: NaiveDate, to: NaiveDate },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
