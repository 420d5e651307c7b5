//! Volatility aggregation — one metric row per diff.

use vigil_core::{diff::Diff, metric::VolatilityMetric, snapshot::Snapshot};

/// Derive the per-snapshot metric record from a diff and its `from` snapshot.
/// Deterministic: the same inputs always produce an identical record.
pub fn derive_metric(diff: &Diff, from: &Snapshot) -> VolatilityMetric {
  // The boolean flags use case-insensitive containment over the rendered
  // descriptor text. Coarse on purpose: a field name appearing inside
  // another field's value also trips the flag. Kept for contract parity
  // with downstream consumers; the structured metadata_changes list is the
  // precise record.
  let descriptor_text = diff
    .metadata_changes
    .iter()
    .map(|c| c.to_string().to_lowercase())
    .collect::<Vec<_>>()
    .join("; ");
  let flagged = |field: &str| descriptor_text.contains(field);

  VolatilityMetric {
    dataset_id:         diff.dataset_id.clone(),
    snapshot_date:      diff.to_date,
    volatility_score:   diff.volatility_score,
    schema_churn_rate:  diff.schema_changes.len() as f64
      / from.columns().len().max(1) as f64,
    content_similarity: 1.0 - diff.content_changes.content_drift,
    license_changed:    flagged("license"),
    url_changed:        flagged("url"),
    publisher_changed:  flagged("publisher"),
    row_count_delta:    diff.content_changes.row_count_delta,
    column_count_delta: diff.content_changes.column_count_delta,
    change_events:      diff.change_events.clone(),
  }
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeMap;

  use chrono::{NaiveDate, Utc};
  use vigil_core::{
    dataset::Availability,
    diff::{ContentChanges, Diff, MetadataChange},
    snapshot::{SchemaInfo, Snapshot},
  };

  use super::*;

  fn snapshot(columns: &[&str]) -> Snapshot {
    Snapshot {
      dataset_id:    "d1".to_owned(),
      snapshot_date: NaiveDate::parse_from_str("2025-06-01", "%Y-%m-%d")
        .unwrap(),
      created_at:    Utc::now(),
      row_count:     Some(10),
      column_count:  Some(columns.len() as i64),
      file_size:     Some(100),
      content_hash:  Some("aa".repeat(32)),
      schema:        Some(SchemaInfo {
        columns: columns.iter().map(|c| (*c).to_owned()).collect(),
        dtypes: BTreeMap::new(),
        sample_data: vec![],
        structure: None,
        note: None,
      }),
      availability:  Availability::Available,
      status_code:   Some(200),
      last_modified: None,
      url:           None,
      title:         None,
      agency:        None,
      license:       None,
      publisher:     None,
    }
  }

  fn diff_with_changes(changes: Vec<MetadataChange>) -> Diff {
    Diff {
      dataset_id:       "d1".to_owned(),
      from_date:        NaiveDate::parse_from_str("2025-06-01", "%Y-%m-%d")
        .unwrap(),
      to_date:          NaiveDate::parse_from_str("2025-06-02", "%Y-%m-%d")
        .unwrap(),
      metadata_changes: changes,
      schema_changes:   vec![],
      content_changes:  ContentChanges {
        row_count_delta:    3,
        column_count_delta: -1,
        content_drift:      0.25,
      },
      volatility_score: 0.4,
      change_events:    vec!["content_replaced".to_owned()],
    }
  }

  fn change(field: &str, old: &str, new: &str) -> MetadataChange {
    MetadataChange {
      field: field.to_owned(),
      old:   Some(old.to_owned()),
      new:   Some(new.to_owned()),
    }
  }

  #[test]
  fn flags_follow_the_changed_fields() {
    let diff = diff_with_changes(vec![
      change("license", "public-domain", "cc-by"),
      change("publisher", "A", "B"),
    ]);
    let metric = derive_metric(&diff, &snapshot(&["a", "b"]));

    assert!(metric.license_changed);
    assert!(metric.publisher_changed);
    assert!(!metric.url_changed);
  }

  #[test]
  fn containment_heuristic_matches_field_names_in_values() {
    // A value mentioning "url" trips the url flag even though only the
    // license field changed. Known coarseness of the text heuristic.
    let diff = diff_with_changes(vec![change(
      "license",
      "see url in terms",
      "cc-by",
    )]);
    let metric = derive_metric(&diff, &snapshot(&["a"]));
    assert!(metric.license_changed);
    assert!(metric.url_changed);
  }

  #[test]
  fn similarity_is_the_complement_of_drift() {
    let diff = diff_with_changes(vec![]);
    let metric = derive_metric(&diff, &snapshot(&["a"]));
    assert_eq!(metric.content_similarity, 1.0 - 0.25);
    assert_eq!(metric.row_count_delta, 3);
    assert_eq!(metric.column_count_delta, -1);
    assert_eq!(metric.change_events, vec!["content_replaced"]);
  }

  #[test]
  fn derivation_is_deterministic() {
    let diff = diff_with_changes(vec![change("url", "a", "b")]);
    let from = snapshot(&["a", "b", "c"]);
    assert_eq!(derive_metric(&diff, &from), derive_metric(&diff, &from));
  }

  #[test]
  fn churn_rate_uses_the_from_schema_width() {
    let mut diff = diff_with_changes(vec![]);
    diff.schema_changes = vec![vigil_core::diff::SchemaChange {
      kind:      vigil_core::diff::SchemaChangeKind::Added,
      column:    "x".to_owned(),
      from_type: None,
      to_type:   Some("text".to_owned()),
    }];
    let metric = derive_metric(&diff, &snapshot(&["a", "b", "c", "d"]));
    assert_eq!(metric.schema_churn_rate, 0.25);

    // Empty from-schema divides by 1, not 0.
    let metric = derive_metric(&diff, &snapshot(&[]));
    assert_eq!(metric.schema_churn_rate, 1.0);
  }
}
