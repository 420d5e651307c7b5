//! The two pipeline passes and their run reports.
//!
//! Every per-item failure is isolated: it is counted, sampled into the
//! report, and never aborts the rest of the run.

use vigil_core::{snapshot::ComputationResult, store::SnapshotStore};

use crate::{
  Result,
  diff::compute_diff,
  fetch::{FetchOutcome, Fetcher},
  volatility::derive_metric,
};

/// Upper bound on error messages carried in a report.
pub const ERROR_SAMPLE_LIMIT: usize = 20;

fn store_err<E: std::error::Error>(e: E) -> crate::Error {
  crate::Error::Store(e.to_string())
}

// ─── Dimension pass ──────────────────────────────────────────────────────────

/// Outcome counts for one dimension pass.
#[derive(Debug, Default)]
pub struct DimensionReport {
  /// Candidates a fetch task settled for.
  pub processed: usize,
  /// Current snapshots back-filled with real dimensions.
  pub updated:   usize,
  /// Connection-level fetch failures and persistence failures.
  pub failed:    usize,
  /// Non-2xx responses, persisted as zero-dimension results.
  pub skipped:   usize,
  /// Bounded sample of error messages.
  pub errors:    Vec<String>,
}

impl DimensionReport {
  fn record_error(&mut self, message: String) {
    if self.errors.len() < ERROR_SAMPLE_LIMIT {
      self.errors.push(message);
    }
  }
}

/// Select up to `limit` candidates, fetch their content, analyze it, and
/// back-fill each dataset's current snapshot.
pub async fn run_dimension_pass<S: SnapshotStore>(
  store: &S,
  fetcher: &Fetcher,
  limit: usize,
) -> Result<DimensionReport> {
  let candidates = store.select_candidates(limit).await.map_err(store_err)?;
  tracing::info!(count = candidates.len(), "selected dimension candidates");

  let outcomes = fetcher.fetch_all(candidates).await;

  let mut report = DimensionReport::default();
  for (record, outcome) in outcomes {
    report.processed += 1;
    match outcome {
      FetchOutcome::Response { status, body } => {
        let ok = (200..300).contains(&status);
        let result = if ok {
          vigil_analyze::analyze(
            &body,
            record.declared_format.as_deref().unwrap_or(""),
          )
        } else {
          // Successful fetch, no content to analyze. Persist the zero
          // dimensions so the note lands on the snapshot.
          ComputationResult::unavailable(format!("HTTP status {status}"))
        };

        match store
          .update_current_snapshot_dimensions(&record.dataset_id, &result)
          .await
        {
          Ok(()) if ok => report.updated += 1,
          Ok(()) => report.skipped += 1,
          Err(e) => {
            report.failed += 1;
            report.record_error(format!("{}: {e}", record.dataset_id));
          }
        }
      }
      // Connection-level failure: nothing persisted, the dataset remains a
      // candidate for the next run.
      FetchOutcome::Failed { error } => {
        report.failed += 1;
        report.record_error(format!("{}: {error}", record.dataset_id));
      }
    }
  }

  tracing::info!(
    processed = report.processed,
    updated = report.updated,
    failed = report.failed,
    skipped = report.skipped,
    "dimension pass finished"
  );
  Ok(report)
}

// ─── Diff pass ───────────────────────────────────────────────────────────────

/// Outcome counts for one diff pass.
#[derive(Debug, Default)]
pub struct DiffReport {
  pub datasets_scanned: usize,
  pub diffs_created:    usize,
  /// Pairs skipped because a diff already exists (or the dates coincide).
  pub pairs_skipped:    usize,
  /// Datasets whose scan aborted on an error.
  pub failed:           usize,
  pub errors:           Vec<String>,
}

impl DiffReport {
  fn record_error(&mut self, message: String) {
    if self.errors.len() < ERROR_SAMPLE_LIMIT {
      self.errors.push(message);
    }
  }
}

/// Walk every dataset with snapshot history, diff each consecutive snapshot
/// pair, and derive the volatility metric for each new diff. Sequential by
/// design; failures are isolated per dataset.
pub async fn run_diff_pass<S: SnapshotStore>(store: &S) -> Result<DiffReport> {
  let ids = store.list_dataset_ids().await.map_err(store_err)?;
  tracing::info!(count = ids.len(), "scanning datasets for new diffs");

  let mut report = DiffReport::default();
  for id in ids {
    report.datasets_scanned += 1;
    if let Err(e) = diff_dataset(store, &id, &mut report).await {
      report.failed += 1;
      report.record_error(format!("{id}: {e}"));
    }
  }

  tracing::info!(
    datasets_scanned = report.datasets_scanned,
    diffs_created = report.diffs_created,
    pairs_skipped = report.pairs_skipped,
    failed = report.failed,
    "diff pass finished"
  );
  Ok(report)
}

async fn diff_dataset<S: SnapshotStore>(
  store: &S,
  dataset_id: &str,
  report: &mut DiffReport,
) -> Result<()> {
  let snapshots = store.get_snapshots(dataset_id).await.map_err(store_err)?;

  for pair in snapshots.windows(2) {
    let (from, to) = (&pair[0], &pair[1]);

    // Same-day re-observations cannot form an ordered pair.
    if from.snapshot_date == to.snapshot_date {
      report.pairs_skipped += 1;
      continue;
    }
    if store
      .diff_exists(dataset_id, from.snapshot_date, to.snapshot_date)
      .await
      .map_err(store_err)?
    {
      report.pairs_skipped += 1;
      continue;
    }

    let diff = compute_diff(from, to)?;
    store.insert_diff(&diff).await.map_err(store_err)?;
    store
      .upsert_volatility_metric(&derive_metric(&diff, from))
      .await
      .map_err(store_err)?;
    report.diffs_created += 1;
  }

  Ok(())
}

// ─── Tests ───────────────────────────────────────────────────────────────────
