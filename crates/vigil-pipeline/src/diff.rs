//! Snapshot diff engine.
//!
//! [`compute_diff`] is a pure function over two snapshots of one dataset. The
//! caller is responsible for the single-diff-per-pair invariant (check
//! `diff_exists` before computing; skip if present).

use std::collections::BTreeSet;

use vigil_core::{
  diff::{
    ContentChanges, Diff, MetadataChange, SchemaChange, SchemaChangeKind,
  },
  snapshot::Snapshot,
};

/// Number of descriptive fields compared by the diff engine.
pub const TRACKED_FIELD_COUNT: usize = 5;

fn tracked_fields(s: &Snapshot) -> [(&'static str, Option<&str>); TRACKED_FIELD_COUNT] {
  [
    ("url", s.url.as_deref()),
    ("title", s.title.as_deref()),
    ("agency", s.agency.as_deref()),
    ("license", s.license.as_deref()),
    ("publisher", s.publisher.as_deref()),
  ]
}

/// Compare two snapshots of the same dataset, `from` strictly before `to`.
pub fn compute_diff(from: &Snapshot, to: &Snapshot) -> vigil_core::Result<Diff> {
  if from.dataset_id != to.dataset_id {
    return Err(vigil_core::Error::DatasetMismatch(
      from.dataset_id.clone(),
      to.dataset_id.clone(),
    ));
  }
  if from.snapshot_date >= to.snapshot_date {
    return Err(vigil_core::Error::SnapshotOrder {
      from: from.snapshot_date,
      to:   to.snapshot_date,
    });
  }

  let metadata_changes = metadata_changes(from, to);
  let schema_changes = schema_changes(from, to);

  // Hash inequality covers presence changes too (None vs Some counts).
  let hash_changed = from.content_hash != to.content_hash;

  let content_changes = ContentChanges {
    row_count_delta:    to.row_count.unwrap_or(0) - from.row_count.unwrap_or(0),
    column_count_delta: to.column_count.unwrap_or(0)
      - from.column_count.unwrap_or(0),
    content_drift:      content_drift(from, to, schema_changes.len(), hash_changed),
  };

  let from_columns = from.columns().len().max(1) as f64;
  let schema_churn_rate = schema_changes.len() as f64 / from_columns;
  let metadata_flip_fraction =
    metadata_changes.len() as f64 / TRACKED_FIELD_COUNT as f64;
  let volatility_score = (0.4 * schema_churn_rate
    + 0.4 * content_changes.content_drift
    + 0.2 * metadata_flip_fraction)
    .clamp(0.0, 1.0);

  let change_events =
    change_events(from, to, &metadata_changes, &schema_changes, hash_changed);

  Ok(Diff {
    dataset_id: from.dataset_id.clone(),
    from_date: from.snapshot_date,
    to_date: to.snapshot_date,
    metadata_changes,
    schema_changes,
    content_changes,
    volatility_score,
    change_events,
  })
}

// ─── Pieces ──────────────────────────────────────────────────────────────────

fn metadata_changes(from: &Snapshot, to: &Snapshot) -> Vec<MetadataChange> {
  tracked_fields(from)
    .into_iter()
    .zip(tracked_fields(to))
    .filter(|((_, old), (_, new))| old != new)
    .map(|((field, old), (_, new))| MetadataChange {
      field: field.to_string(),
      old:   old.map(str::to_owned),
      new:   new.map(str::to_owned),
    })
    .collect()
}

/// Set-difference the column lists: additions in `to` order, removals in
/// `from` order, then retypes in `from` order.
fn schema_changes(from: &Snapshot, to: &Snapshot) -> Vec<SchemaChange> {
  let from_set: BTreeSet<&str> =
    from.columns().iter().map(String::as_str).collect();
  let to_set: BTreeSet<&str> = to.columns().iter().map(String::as_str).collect();

  let mut changes = Vec::new();

  for column in to.columns() {
    if !from_set.contains(column.as_str()) {
      changes.push(SchemaChange {
        kind:      SchemaChangeKind::Added,
        column:    column.clone(),
        from_type: None,
        to_type:   to.dtype(column).map(str::to_owned),
      });
    }
  }

  for column in from.columns() {
    if !to_set.contains(column.as_str()) {
      changes.push(SchemaChange {
        kind:      SchemaChangeKind::Removed,
        column:    column.clone(),
        from_type: from.dtype(column).map(str::to_owned),
        to_type:   None,
      });
    }
  }

  for column in from.columns() {
    if to_set.contains(column.as_str()) {
      let from_type = from.dtype(column);
      let to_type = to.dtype(column);
      if from_type != to_type {
        changes.push(SchemaChange {
          kind:      SchemaChangeKind::Retyped,
          column:    column.clone(),
          from_type: from_type.map(str::to_owned),
          to_type:   to_type.map(str::to_owned),
        });
      }
    }
  }

  changes
}

/// 0 when the content hash is unchanged; otherwise a floor of 0.2 plus terms
/// monotonic in schema churn and relative size delta, capped at 1.
fn content_drift(
  from: &Snapshot,
  to: &Snapshot,
  schema_change_count: usize,
  hash_changed: bool,
) -> f64 {
  if !hash_changed {
    return 0.0;
  }

  let from_columns = from.columns().len().max(1) as f64;
  let schema_term = (schema_change_count as f64 / from_columns).min(1.0);

  let from_size = from.file_size.unwrap_or(0).max(1) as f64;
  let size_delta =
    (to.file_size.unwrap_or(0) - from.file_size.unwrap_or(0)).abs() as f64;
  let size_term = (size_delta / from_size).min(1.0);

  (0.2 + 0.4 * schema_term + 0.4 * size_term).clamp(0.0, 1.0)
}

fn change_events(
  from: &Snapshot,
  to: &Snapshot,
  metadata_changes: &[MetadataChange],
  schema_changes: &[SchemaChange],
  hash_changed: bool,
) -> Vec<String> {
  use vigil_core::dataset::Availability;

  let mut events = Vec::new();
  let has_kind = |kind: SchemaChangeKind| {
    schema_changes.iter().any(|c| c.kind == kind)
  };
  let field_changed = |field: &str| {
    metadata_changes.iter().any(|c| c.field == field)
  };

  if has_kind(SchemaChangeKind::Added) {
    events.push("schema_growth".to_string());
  }
  if has_kind(SchemaChangeKind::Removed) {
    events.push("schema_shrink".to_string());
  }
  if has_kind(SchemaChangeKind::Retyped) {
    events.push("schema_retyped".to_string());
  }
  if field_changed("url") {
    events.push("url_changed".to_string());
  }
  if field_changed("license") {
    events.push("license_changed".to_string());
  }
  if field_changed("publisher") {
    events.push("publisher_changed".to_string());
  }
  if hash_changed && from.content_hash.is_some() && to.content_hash.is_some() {
    events.push("content_replaced".to_string());
  }
  if from.availability == Availability::Available
    && to.availability == Availability::Unavailable
  {
    events.push("became_unavailable".to_string());
  }
  if from.availability != Availability::Available
    && to.availability == Availability::Available
  {
    events.push("became_available".to_string());
  }

  events
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::collections::BTreeMap;

  use chrono::{NaiveDate, Utc};
  use vigil_core::{
    dataset::Availability,
    snapshot::{SchemaInfo, Snapshot},
  };

  use super::*;

  fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
  }

  fn snap(day: &str, columns: &[(&str, &str)]) -> Snapshot {
    let mut dtypes = BTreeMap::new();
    for (name, ty) in columns {
      dtypes.insert((*name).to_owned(), (*ty).to_owned());
    }
    Snapshot {
      dataset_id:    "d1".to_owned(),
      snapshot_date: date(day),
      created_at:    Utc::now(),
      row_count:     Some(100),
      column_count:  Some(columns.len() as i64),
      file_size:     Some(1000),
      content_hash:  Some("aa".repeat(32)),
      schema:        Some(SchemaInfo {
        columns: columns.iter().map(|(n, _)| (*n).to_owned()).collect(),
        dtypes,
        sample_data: vec![],
        structure: None,
        note: None,
      }),
      availability:  Availability::Available,
      status_code:   Some(200),
      last_modified: None,
      url:           Some("https://data.example.gov/d1.csv".to_owned()),
      title:         Some("Dataset".to_owned()),
      agency:        Some("Agency".to_owned()),
      license:       Some("public-domain".to_owned()),
      publisher:     Some("Publisher".to_owned()),
    }
  }

  #[test]
  fn identical_snapshots_yield_zero_score() {
    let from = snap("2025-06-01", &[("a", "integer"), ("b", "text")]);
    let to = snap("2025-06-02", &[("a", "integer"), ("b", "text")]);
    let diff = compute_diff(&from, &to).unwrap();

    assert!(diff.metadata_changes.is_empty());
    assert!(diff.schema_changes.is_empty());
    assert_eq!(diff.content_changes.content_drift, 0.0);
    assert_eq!(diff.volatility_score, 0.0);
    assert!(diff.change_events.is_empty());
  }

  #[test]
  fn score_stays_in_unit_interval_under_total_change() {
    let mut from = snap("2025-06-01", &[("a", "integer")]);
    from.file_size = Some(1);
    let mut to =
      snap("2025-06-02", &[("x", "text"), ("y", "text"), ("z", "text")]);
    to.content_hash = Some("bb".repeat(32));
    to.file_size = Some(1_000_000);
    to.url = Some("https://elsewhere.example.gov/d1.csv".to_owned());
    to.license = Some("cc-by".to_owned());
    to.publisher = Some("Someone Else".to_owned());
    to.title = Some("Renamed".to_owned());
    to.agency = Some("Other Agency".to_owned());

    let diff = compute_diff(&from, &to).unwrap();
    assert!((0.0..=1.0).contains(&diff.volatility_score));
    assert_eq!(diff.metadata_changes.len(), 5);
  }

  #[test]
  fn score_is_monotonic_in_schema_changes() {
    let from = snap(
      "2025-06-01",
      &[("a", "integer"), ("b", "text"), ("c", "text"), ("d", "text")],
    );
    let one_added = snap(
      "2025-06-02",
      &[("a", "integer"), ("b", "text"), ("c", "text"), ("d", "text"), ("e", "text")],
    );
    let three_added = snap(
      "2025-06-02",
      &[
        ("a", "integer"),
        ("b", "text"),
        ("c", "text"),
        ("d", "text"),
        ("e", "text"),
        ("f", "text"),
        ("g", "text"),
      ],
    );

    let small = compute_diff(&from, &one_added).unwrap();
    let large = compute_diff(&from, &three_added).unwrap();
    assert!(large.volatility_score >= small.volatility_score);
  }

  #[test]
  fn unchanged_hash_means_zero_drift_even_with_schema_churn() {
    let from = snap("2025-06-01", &[("a", "integer")]);
    let to = snap("2025-06-02", &[("a", "text"), ("b", "text")]);
    // Same content_hash on both sides.
    let diff = compute_diff(&from, &to).unwrap();
    assert_eq!(diff.content_changes.content_drift, 0.0);
    assert!(!diff.schema_changes.is_empty());
  }

  #[test]
  fn changed_hash_gives_strictly_positive_drift() {
    let from = snap("2025-06-01", &[("a", "integer")]);
    let mut to = snap("2025-06-02", &[("a", "integer")]);
    to.content_hash = Some("bb".repeat(32));
    let diff = compute_diff(&from, &to).unwrap();
    assert!(diff.content_changes.content_drift > 0.0);
    assert!(diff.change_events.contains(&"content_replaced".to_string()));
  }

  #[test]
  fn schema_changes_are_classified() {
    let from = snap("2025-06-01", &[("keep", "integer"), ("drop", "text")]);
    let to = snap("2025-06-02", &[("keep", "text"), ("new", "number")]);
    let diff = compute_diff(&from, &to).unwrap();

    let kinds: Vec<_> = diff
      .schema_changes
      .iter()
      .map(|c| (c.kind, c.column.as_str()))
      .collect();
    assert_eq!(
      kinds,
      vec![
        (SchemaChangeKind::Added, "new"),
        (SchemaChangeKind::Removed, "drop"),
        (SchemaChangeKind::Retyped, "keep"),
      ]
    );
    assert!(diff.change_events.contains(&"schema_growth".to_string()));
    assert!(diff.change_events.contains(&"schema_shrink".to_string()));
    assert!(diff.change_events.contains(&"schema_retyped".to_string()));
  }

  #[test]
  fn metadata_events_name_the_changed_fields() {
    let from = snap("2025-06-01", &[("a", "integer")]);
    let mut to = snap("2025-06-02", &[("a", "integer")]);
    to.license = Some("cc-by".to_owned());
    to.url = Some("https://moved.example.gov/d1.csv".to_owned());

    let diff = compute_diff(&from, &to).unwrap();
    assert!(diff.change_events.contains(&"license_changed".to_string()));
    assert!(diff.change_events.contains(&"url_changed".to_string()));
    assert!(!diff.change_events.contains(&"publisher_changed".to_string()));
  }

  #[test]
  fn availability_transitions_are_reported() {
    let from = snap("2025-06-01", &[("a", "integer")]);
    let mut to = snap("2025-06-02", &[("a", "integer")]);
    to.availability = Availability::Unavailable;
    let diff = compute_diff(&from, &to).unwrap();
    assert!(diff.change_events.contains(&"became_unavailable".to_string()));

    let mut back_from = to.clone();
    back_from.snapshot_date = date("2025-06-02");
    let mut back_to = from.clone();
    back_to.snapshot_date = date("2025-06-03");
    let diff = compute_diff(&back_from, &back_to).unwrap();
    assert!(diff.change_events.contains(&"became_available".to_string()));
  }

  #[test]
  fn mismatched_datasets_are_rejected() {
    let from = snap("2025-06-01", &[("a", "integer")]);
    let mut to = snap("2025-06-02", &[("a", "integer")]);
    to.dataset_id = "other".to_owned();
    assert!(matches!(
      compute_diff(&from, &to),
      Err(vigil_core::Error::DatasetMismatch(..))
    ));
  }

  #[test]
  fn out_of_order_snapshots_are_rejected() {
    let from = snap("2025-06-02", &[("a", "integer")]);
    let to = snap("2025-06-01", &[("a", "integer")]);
    assert!(matches!(
      compute_diff(&from, &to),
      Err(vigil_core::Error::SnapshotOrder { .. })
    ));

    let same_day = snap("2025-06-02", &[("a", "integer")]);
    assert!(compute_diff(&from, &same_day).is_err());
  }
}
