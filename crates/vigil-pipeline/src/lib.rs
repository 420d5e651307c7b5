//! Pipeline orchestration for vigil.
//!
//! Runs two passes over any [`SnapshotStore`](vigil_core::store::SnapshotStore):
//! the *dimension pass* (select candidates, fetch their content concurrently,
//! analyze it, back-fill the current snapshot) and the *diff pass* (walk each
//! dataset's snapshot history, diff consecutive pairs, derive volatility
//! metrics).

pub mod diff;
pub mod error;
pub mod fetch;
pub mod run;
pub mod volatility;

pub use error::{Error, Result};

use std::path::PathBuf;

use serde::Deserialize;

use fetch::FetchConfig;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime pipeline configuration, deserialised from `config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
  pub store_path:      PathBuf,
  /// Maximum number of candidates pulled per dimension pass.
  #[serde(default = "default_candidate_limit")]
  pub candidate_limit: usize,
  #[serde(default)]
  pub fetch:           FetchConfig,
}

fn default_candidate_limit() -> usize { 200 }
