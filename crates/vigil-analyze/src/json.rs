//! JSON structural analysis.
//!
//! Arrays count one row per element; objects count as a single record with
//! one column per key; anything else is a primitive with zero counts.

use std::collections::BTreeMap;

use serde_json::Value;
use vigil_core::snapshot::SchemaInfo;

use crate::Analysis;

/// Number of sample elements kept in the serialized schema.
const SAMPLE_ROWS: usize = 3;

/// Analyze JSON content. A parse failure degrades to zero counts with a
/// diagnostic note rather than an error.
pub(crate) fn analyze(bytes: &[u8]) -> Analysis {
  let value: Value = match serde_json::from_slice(bytes) {
    Ok(v) => v,
    Err(e) => {
      return Analysis {
        row_count:    0,
        column_count: 0,
        schema:       Some(SchemaInfo::note_only(format!("invalid JSON: {e}"))),
      };
    }
  };

  match value {
    Value::Array(elements) => analyze_array(elements),
    Value::Object(map) => {
      let columns: Vec<String> = map.keys().cloned().collect();
      let dtypes = dtypes_of(&map);
      Analysis {
        row_count:    1,
        column_count: columns.len() as i64,
        schema:       Some(SchemaInfo {
          columns,
          dtypes,
          sample_data: vec![Value::Object(map)],
          structure: Some("object".to_string()),
          note: None,
        }),
      }
    }
    _ => Analysis {
      row_count:    0,
      column_count: 0,
      schema:       Some(SchemaInfo {
        structure: Some("primitive".to_string()),
        ..SchemaInfo::default()
      }),
    },
  }
}

fn analyze_array(elements: Vec<Value>) -> Analysis {
  let row_count = elements.len() as i64;

  let (columns, dtypes) = match elements.first() {
    Some(Value::Object(first)) => {
      (first.keys().cloned().collect::<Vec<_>>(), dtypes_of(first))
    }
    _ => (Vec::new(), BTreeMap::new()),
  };

  let sample_data: Vec<Value> =
    elements.into_iter().take(SAMPLE_ROWS).collect();

  Analysis {
    row_count,
    column_count: columns.len() as i64,
    schema: Some(SchemaInfo {
      columns,
      dtypes,
      sample_data,
      structure: Some("array".to_string()),
      note: None,
    }),
  }
}

/// Map each key of a JSON object to its value's type name.
fn dtypes_of(map: &serde_json::Map<String, Value>) -> BTreeMap<String, String> {
  map
    .iter()
    .map(|(k, v)| (k.clone(), type_name(v).to_string()))
    .collect()
}

fn type_name(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
    Value::Number(_) => "number",
    Value::String(_) => "text",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
