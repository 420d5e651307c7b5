//! ZIP archive analysis.
//!
//! Enumerates members; if any member has a delimited-text extension, the
//! first such member is extracted and analyzed as delimited text. Otherwise
//! the result lists member names with zero counts.

use std::io::{Cursor, Read};

use vigil_core::snapshot::SchemaInfo;
use zip::ZipArchive;

use crate::{Analysis, delimited, error::Result};

/// Extensions treated as delimited text inside an archive, with their
/// delimiters.
const DELIMITED_EXTENSIONS: &[(&str, char)] =
  &[(".csv", ','), (".tsv", '\t'), (".txt", ',')];

/// Analyze a ZIP archive. Corrupt archives degrade to zero counts with a
/// diagnostic note.
pub(crate) fn analyze(bytes: &[u8]) -> Analysis {
  match analyze_inner(bytes) {
    Ok(analysis) => analysis,
    Err(e) => Analysis {
      row_count:    0,
      column_count: 0,
      schema:       Some(SchemaInfo::note_only(format!("unreadable archive: {e}"))),
    },
  }
}

fn analyze_inner(bytes: &[u8]) -> Result<Analysis> {
  let mut archive = ZipArchive::new(Cursor::new(bytes))?;

  let member_names: Vec<String> =
    archive.file_names().map(str::to_string).collect();

  // First member with a delimited-text extension, in archive order.
  let target = member_names.iter().find_map(|name| {
    let lower = name.to_ascii_lowercase();
    DELIMITED_EXTENSIONS
      .iter()
      .find(|(ext, _)| lower.ends_with(ext))
      .map(|(_, delim)| (name.clone(), *delim))
  });

  let Some((name, delim)) = target else {
    // No delimited member — report the member listing.
    return Ok(Analysis {
      row_count:    0,
      column_count: 0,
      schema:       Some(SchemaInfo {
        columns: member_names,
        note: Some("no delimited-text member".to_string()),
        ..SchemaInfo::default()
      }),
    });
  };

  let mut member = archive.by_name(&name)?;
  let mut contents = Vec::new();
  member
    .read_to_end(&mut contents)
    .map_err(|_| crate::error::Error::MemberUnreadable(name.clone()))?;

  let mut analysis = delimited::analyze(&contents, delim);
  if let Some(schema) = analysis.schema.as_mut() {
    schema.note = Some(format!("analyzed archive member {name:?}"));
  }
  Ok(analysis)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::io::Write;

  use zip::write::SimpleFileOptions;

  use super::*;

  fn build_zip(members: &[(&str, &[u8])]) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
      let mut writer = zip::ZipWriter::new(&mut cursor);
      for (name, data) in members {
        writer
          .start_file(*name, SimpleFileOptions::default())
          .unwrap();
        writer.write_all(data).unwrap();
      }
      writer.finish().unwrap();
    }
    cursor.into_inner()
  }

  #[test]
  fn archive_with_csv_member_is_analyzed_as_delimited() {
    let zip_bytes = build_zip(&[
      ("readme.md", b"hello"),
      ("data.csv", b"a,b,c\n1,2,3\n4,5,6\n"),
    ]);
    let r = analyze(&zip_bytes);
    assert_eq!(r.row_count, 2);
    assert_eq!(r.column_count, 3);
    let note = r.schema.unwrap().note.unwrap();
    assert!(note.contains("data.csv"), "note: {note}");
  }

  #[test]
  fn archive_without_delimited_member_lists_names() {
    let zip_bytes =
      build_zip(&[("a.bin", b"\x00\x01"), ("b.parquet", b"\x02")]);
    let r = analyze(&zip_bytes);
    assert_eq!(r.row_count, 0);
    assert_eq!(r.column_count, 0);
    let schema = r.schema.unwrap();
    assert_eq!(schema.columns, ["a.bin", "b.parquet"]);
  }

  #[test]
  fn corrupt_archive_degrades_with_note() {
    let r = analyze(b"this is not a zip file");
    assert_eq!(r.row_count, 0);
    assert_eq!(r.column_count, 0);
    assert!(r.schema.unwrap().note.unwrap().contains("unreadable archive"));
  }

  #[test]
  fn tsv_member_uses_tab_delimiter() {
    let zip_bytes = build_zip(&[("table.tsv", b"x\ty\n1\t2\n")]);
    let r = analyze(&zip_bytes);
    assert_eq!(r.row_count, 1);
    assert_eq!(r.column_count, 2);
  }
}
