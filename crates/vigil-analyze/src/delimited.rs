//! Delimited-text (CSV/TSV/plain) structural analysis.
//!
//! Pipeline:
//!   raw bytes
//!     └─ lossy UTF-8 → non-empty lines (row_count = lines - 1)
//!          └─ quote-aware field split per line → header + records
//!               └─ dtype inference + ≤3 sample records → SchemaInfo
//!
//! If the structured parse fails (unterminated quote, ragged rows), the
//! first line is naively split on the delimiter to estimate the column
//! count and the line-based row count is kept.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use vigil_core::snapshot::SchemaInfo;

use crate::{
  Analysis,
  error::{Error, Result},
};

/// Number of data rows sampled for datatype inference.
const INFERENCE_ROWS: usize = 16;

/// Number of sample records kept in the serialized schema.
const SAMPLE_ROWS: usize = 3;

// ─── Entry point ─────────────────────────────────────────────────────────────

/// Analyze delimited text. Never fails; parse errors engage the naive
/// fallback and are recorded in the schema note.
pub(crate) fn analyze(bytes: &[u8], delim: char) -> Analysis {
  let text = String::from_utf8_lossy(bytes);
  let lines: Vec<&str> = text
    .lines()
    .map(str::trim_end)
    .filter(|l| !l.is_empty())
    .collect();

  // First line is the header.
  let row_count = (lines.len() as i64 - 1).max(0);

  match parse_structured(&lines, delim) {
    Ok(Some(schema)) => Analysis {
      row_count,
      column_count: schema.columns.len() as i64,
      schema:       Some(schema),
    },
    Ok(None) => Analysis::empty(),
    Err(e) => naive_fallback(&lines, delim, row_count, &e),
  }
}

/// Estimate the column count by splitting the first line on the delimiter.
fn naive_fallback(
  lines: &[&str],
  delim: char,
  row_count: i64,
  cause: &Error,
) -> Analysis {
  let Some(first) = lines.first() else {
    return Analysis::empty();
  };
  let columns: Vec<String> = first
    .split(delim)
    .map(|f| f.trim().trim_matches('"').to_string())
    .collect();

  let mut schema = SchemaInfo {
    columns,
    ..SchemaInfo::default()
  };
  schema.note = Some(format!("structured parse failed ({cause}); naive split"));

  Analysis {
    row_count,
    column_count: schema.columns.len() as i64,
    schema: Some(schema),
  }
}

// ─── Structured parse ────────────────────────────────────────────────────────

/// Parse header + records with quote handling. Returns `Ok(None)` for empty
/// input and `Err` when the content is not consistently delimited.
fn parse_structured(lines: &[&str], delim: char) -> Result<Option<SchemaInfo>> {
  let Some((header_line, data_lines)) = lines.split_first() else {
    return Ok(None);
  };

  let header = split_fields(header_line, delim, 1)?;
  if header.is_empty() {
    return Ok(None);
  }

  // Parse a bounded prefix of the data rows; inference and samples don't
  // need the whole file.
  let mut records: Vec<Vec<String>> = Vec::new();
  for (i, line) in data_lines.iter().take(INFERENCE_ROWS).enumerate() {
    let fields = split_fields(line, delim, i + 2)?;
    if fields.len() != header.len() {
      return Err(Error::RaggedRow {
        line:     i + 2,
        expected: header.len(),
        found:    fields.len(),
      });
    }
    records.push(fields);
  }

  let dtypes = infer_dtypes(&header, &records);
  let sample_data = records
    .iter()
    .take(SAMPLE_ROWS)
    .map(|rec| {
      let obj: serde_json::Map<String, serde_json::Value> = header
        .iter()
        .zip(rec)
        .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
        .collect();
      serde_json::Value::Object(obj)
    })
    .collect();

  Ok(Some(SchemaInfo {
    columns: header,
    dtypes,
    sample_data,
    structure: None,
    note: None,
  }))
}

/// Split one line into fields, honouring double-quoted fields with `""`
/// escapes. `line_no` is 1-based, for diagnostics.
fn split_fields(line: &str, delim: char, line_no: usize) -> Result<Vec<String>> {
  let mut fields = Vec::new();
  let mut field = String::new();
  let mut in_quotes = false;
  let mut chars = line.chars().peekable();

  while let Some(c) = chars.next() {
    match c {
      '"' if in_quotes => {
        if chars.peek() == Some(&'"') {
          chars.next();
          field.push('"');
        } else {
          in_quotes = false;
        }
      }
      '"' if field.is_empty() => in_quotes = true,
      '"' => field.push('"'), // stray quote mid-field, keep literally
      c if c == delim && !in_quotes => {
        fields.push(std::mem::take(&mut field));
      }
      c => field.push(c),
    }
  }

  if in_quotes {
    return Err(Error::UnterminatedQuote(line_no));
  }
  fields.push(field);
  Ok(fields)
}

// ─── Datatype inference ──────────────────────────────────────────────────────

fn infer_dtypes(
  header: &[String],
  records: &[Vec<String>],
) -> BTreeMap<String, String> {
  header
    .iter()
    .enumerate()
    .map(|(i, name)| {
      let values: Vec<&str> = records
        .iter()
        .filter_map(|r| r.get(i))
        .map(String::as_str)
        .filter(|v| !v.trim().is_empty())
        .collect();
      (name.clone(), infer_dtype(&values).to_string())
    })
    .collect()
}

/// Infer a column type from its non-empty sample values.
fn infer_dtype(values: &[&str]) -> &'static str {
  if values.is_empty() {
    return "text";
  }
  let all = |pred: fn(&str) -> bool| values.iter().all(|v| pred(v.trim()));

  if all(|v| v.parse::<i64>().is_ok()) {
    "integer"
  } else if all(|v| v.parse::<f64>().is_ok()) {
    "number"
  } else if all(|v| v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("false")) {
    "boolean"
  } else if all(|v| NaiveDate::parse_from_str(v, "%Y-%m-%d").is_ok()) {
    "date"
  } else {
    "text"
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn header_plus_three_rows_of_four_fields() {
    let input = b"a,b,c,d\n1,2,3,4\n5,6,7,8\n9,10,11,12\n";
    let r = analyze(input, ',');
    assert_eq!(r.row_count, 3);
    assert_eq!(r.column_count, 4);
    let schema = r.schema.unwrap();
    assert_eq!(schema.columns, ["a", "b", "c", "d"]);
    assert_eq!(schema.sample_data.len(), 3);
  }

  #[test]
  fn empty_input_yields_zero_counts() {
    let r = analyze(b"", ',');
    assert_eq!(r.row_count, 0);
    assert_eq!(r.column_count, 0);
    assert!(r.schema.is_none());
  }

  #[test]
  fn header_only_yields_zero_rows() {
    let r = analyze(b"name,value\n", ',');
    assert_eq!(r.row_count, 0);
    assert_eq!(r.column_count, 2);
  }

  #[test]
  fn blank_lines_are_not_rows() {
    let r = analyze(b"a,b\n\n1,2\n\n\n3,4\n", ',');
    assert_eq!(r.row_count, 2);
  }

  #[test]
  fn quoted_field_with_embedded_delimiter() {
    let r = analyze(b"name,notes\nalice,\"likes a, b and c\"\n", ',');
    assert_eq!(r.row_count, 1);
    assert_eq!(r.column_count, 2);
    let schema = r.schema.unwrap();
    assert_eq!(
      schema.sample_data[0]["notes"],
      serde_json::json!("likes a, b and c")
    );
  }

  #[test]
  fn escaped_quotes_inside_quoted_field() {
    let r = analyze(b"q\n\"she said \"\"hi\"\"\"\n", ',');
    let schema = r.schema.unwrap();
    assert_eq!(schema.sample_data[0]["q"], serde_json::json!("she said \"hi\""));
  }

  #[test]
  fn tab_delimited() {
    let r = analyze(b"x\ty\tz\n1\t2\t3\n", '\t');
    assert_eq!(r.row_count, 1);
    assert_eq!(r.column_count, 3);
  }

  #[test]
  fn ragged_rows_fall_back_to_naive_split() {
    let input = b"a,b,c\n1,2\n1,2,3,4\n";
    let r = analyze(input, ',');
    // row_count stays line-based; column_count from the naive header split.
    assert_eq!(r.row_count, 2);
    assert_eq!(r.column_count, 3);
    let schema = r.schema.unwrap();
    assert!(schema.note.unwrap().contains("naive split"));
    assert!(schema.sample_data.is_empty());
  }

  #[test]
  fn unterminated_quote_falls_back() {
    let input = b"a,b\n\"open,2\n";
    let r = analyze(input, ',');
    assert_eq!(r.row_count, 1);
    assert_eq!(r.column_count, 2);
    assert!(r.schema.unwrap().note.is_some());
  }

  #[test]
  fn dtype_inference() {
    let input =
      b"id,price,active,joined,name\n1,9.5,true,2021-04-01,alice\n2,8,false,2022-01-15,bob\n";
    let schema = analyze(input, ',').schema.unwrap();
    assert_eq!(schema.dtypes["id"], "integer");
    assert_eq!(schema.dtypes["price"], "number");
    assert_eq!(schema.dtypes["active"], "boolean");
    assert_eq!(schema.dtypes["joined"], "date");
    assert_eq!(schema.dtypes["name"], "text");
  }

  #[test]
  fn empty_column_defaults_to_text() {
    let schema = analyze(b"a,b\n1,\n2,\n", ',').schema.unwrap();
    assert_eq!(schema.dtypes["b"], "text");
  }
}
