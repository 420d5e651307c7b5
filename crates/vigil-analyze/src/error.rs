//! Error types for the vigil-analyze crate.
//!
//! These never escape [`analyze`](crate::analyze) — parse failures degrade
//! to zero or partial counts with a diagnostic note. Submodules use them
//! internally to signal when a fallback should engage.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unterminated quoted field on line {0}")]
  UnterminatedQuote(usize),

  #[error("line {line} has {found} fields, header has {expected}")]
  RaggedRow {
    line:     usize,
    expected: usize,
    found:    usize,
  },

  #[error("archive error: {0}")]
  Archive(#[from] zip::result::ZipError),

  #[error("archive member {0:?} is not readable")]
  MemberUnreadable(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
