//! The `SnapshotStore` trait — the persistence seam of the monitor.
//!
//! Implemented by storage backends (e.g. `vigil-store-sqlite`). The pipeline
//! depends on this abstraction, not on any concrete backend.

use std::future::Future;

use chrono::NaiveDate;

use crate::{
  dataset::DatasetRecord,
  diff::Diff,
  metric::VolatilityMetric,
  snapshot::{ComputationResult, Snapshot},
};

/// Abstraction over the dataset/snapshot/diff store.
///
/// Snapshots are append-only; the only in-place mutation is the back-fill of
/// dimension fields on a dataset's *current* snapshot (maximum `created_at`).
/// Diffs are insert-once per `(dataset_id, from_date, to_date)`; volatility
/// metrics are upserted on `(dataset_id, snapshot_date)`.
///
/// All methods return `Send` futures so the trait can be used from
/// multi-threaded async runtimes.
pub trait SnapshotStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Catalog ───────────────────────────────────────────────────────────

  /// Insert or replace a dataset catalog record.
  fn upsert_dataset(
    &self,
    record: DatasetRecord,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Return up to `limit` datasets whose current snapshot is available, has
  /// a non-empty URL, and is missing a row or column count — most recently
  /// created first. Read-only; callers re-invoke until empty.
  fn select_candidates(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<DatasetRecord>, Self::Error>> + Send + '_;

  // ── Snapshots ─────────────────────────────────────────────────────────

  /// Append a snapshot row; returns the storage row id.
  fn insert_snapshot(
    &self,
    snapshot: Snapshot,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + '_;

  /// All snapshots for a dataset, ascending by `snapshot_date`.
  fn get_snapshots<'a>(
    &'a self,
    dataset_id: &'a str,
  ) -> impl Future<Output = Result<Vec<Snapshot>, Self::Error>> + Send + 'a;

  /// Distinct dataset ids that have at least one snapshot.
  fn list_dataset_ids(
    &self,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  /// Merge a [`ComputationResult`] into the snapshot with the maximum
  /// `created_at` for `dataset_id`, setting only the dimension fields.
  /// Executes as one all-or-nothing transaction; earlier snapshots are
  /// never touched.
  fn update_current_snapshot_dimensions<'a>(
    &'a self,
    dataset_id: &'a str,
    result: &'a ComputationResult,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Diffs & metrics ───────────────────────────────────────────────────

  /// Whether a diff is already stored for the given snapshot pair.
  fn diff_exists<'a>(
    &'a self,
    dataset_id: &'a str,
    from_date: NaiveDate,
    to_date: NaiveDate,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Insert a freshly computed diff; returns the storage row id. Fails if a
  /// diff for the same pair already exists.
  fn insert_diff<'a>(
    &'a self,
    diff: &'a Diff,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + 'a;

  /// Retrieve a stored diff by its snapshot pair.
  fn get_diff<'a>(
    &'a self,
    dataset_id: &'a str,
    from_date: NaiveDate,
    to_date: NaiveDate,
  ) -> impl Future<Output = Result<Option<Diff>, Self::Error>> + Send + 'a;

  /// Insert or fully replace the metric row keyed by
  /// `(dataset_id, snapshot_date)`.
  fn upsert_volatility_metric<'a>(
    &'a self,
    metric: &'a VolatilityMetric,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Retrieve a stored metric by its key.
  fn get_volatility_metric<'a>(
    &'a self,
    dataset_id: &'a str,
    snapshot_date: NaiveDate,
  ) -> impl Future<Output = Result<Option<VolatilityMetric>, Self::Error>> + Send + 'a;
}
