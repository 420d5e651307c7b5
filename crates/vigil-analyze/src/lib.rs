//! Format-aware content analysis for vigil.
//!
//! Converts raw fetched bytes plus a declared format label into a
//! [`ComputationResult`]. Pure and synchronous; no HTTP or database
//! dependencies.
//!
//! # Quick start
//!
//! ```no_run
//! use vigil_analyze::analyze;
//!
//! let result = analyze(b"a,b\n1,2\n", "csv");
//! assert_eq!(result.row_count, 1);
//! assert_eq!(result.column_count, 2);
//! ```

pub mod error;

mod archive;
mod delimited;
mod fingerprint;
mod json;

pub use error::{Error, Result};
pub use fingerprint::fingerprint;

use chrono::Utc;
use vigil_core::snapshot::{ComputationResult, SchemaInfo};

// ─── Internal shape ──────────────────────────────────────────────────────────

/// Counts and schema produced by one format analyzer.
pub(crate) struct Analysis {
  pub row_count:    i64,
  pub column_count: i64,
  pub schema:       Option<SchemaInfo>,
}

impl Analysis {
  pub(crate) fn empty() -> Self {
    Self {
      row_count:    0,
      column_count: 0,
      schema:       None,
    }
  }
}

// ─── Format dispatch ─────────────────────────────────────────────────────────

/// Content family resolved from a declared format label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
  /// Comma/tab/plain delimited text, with its delimiter.
  Delimited(char),
  Json,
  Archive,
  Spreadsheet,
}

impl Format {
  /// Resolve a catalog format label, case-insensitively. Unknown or missing
  /// labels default to comma-delimited text.
  fn detect(label: &str) -> Self {
    match label.trim().to_ascii_lowercase().as_str() {
      "json" => Self::Json,
      "zip" => Self::Archive,
      "xls" | "xlsx" | "xlsm" => Self::Spreadsheet,
      "tsv" | "tab" => Self::Delimited('\t'),
      _ => Self::Delimited(','),
    }
  }
}

// ─── Public API ──────────────────────────────────────────────────────────────

/// Analyze `bytes` according to `declared_format`.
///
/// Always returns a [`ComputationResult`]; parse failures degrade to zero or
/// partial counts with a diagnostic note in the schema record. The content
/// fingerprint and file size are computed over the exact raw bytes
/// regardless of format.
pub fn analyze(bytes: &[u8], declared_format: &str) -> ComputationResult {
  let analysis = match Format::detect(declared_format) {
    Format::Delimited(delim) => delimited::analyze(bytes, delim),
    Format::Json => json::analyze(bytes),
    Format::Archive => archive::analyze(bytes),
    Format::Spreadsheet => Analysis {
      row_count:    0,
      column_count: 0,
      // Recognised but not computed in this core; explicitly not an error.
      schema:       Some(SchemaInfo::note_only(format!(
        "spreadsheet format {declared_format:?} not implemented"
      ))),
    },
  };

  ComputationResult {
    row_count:    analysis.row_count,
    column_count: analysis.column_count,
    file_size:    bytes.len() as i64,
    content_hash: fingerprint(bytes),
    schema_info:  analysis.schema,
    analyzed_at:  Utc::now(),
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn label_is_case_insensitive() {
    let upper = analyze(b"[1,2]", "JSON");
    let lower = analyze(b"[1,2]", "json");
    assert_eq!(upper.row_count, lower.row_count);
    assert_eq!(upper.row_count, 2);
  }

  #[test]
  fn unknown_label_defaults_to_delimited() {
    let r = analyze(b"a,b\n1,2\n", "shapefile");
    assert_eq!(r.row_count, 1);
    assert_eq!(r.column_count, 2);
  }

  #[test]
  fn empty_label_defaults_to_delimited() {
    let r = analyze(b"a,b\n1,2\n", "");
    assert_eq!(r.column_count, 2);
  }

  #[test]
  fn spreadsheet_is_marked_not_implemented() {
    let r = analyze(b"\xd0\xcf\x11\xe0", "xlsx");
    assert_eq!(r.row_count, 0);
    assert_eq!(r.column_count, 0);
    let note = r.schema_info.unwrap().note.unwrap();
    assert!(note.contains("not implemented"), "note: {note}");
  }

  #[test]
  fn result_carries_size_and_fingerprint() {
    let input = b"a,b\n1,2\n";
    let r = analyze(input, "csv");
    assert_eq!(r.file_size, input.len() as i64);
    assert_eq!(r.content_hash, fingerprint(input));
  }
}
