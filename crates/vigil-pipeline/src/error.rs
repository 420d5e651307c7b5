//! Error type for `vigil-pipeline`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] vigil_core::Error),

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  /// A store-level failure, carried as text because the store backend is
  /// generic at this layer.
  #[error("store error: {0}")]
  Store(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
