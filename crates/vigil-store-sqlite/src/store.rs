//! [`SqliteStore`] — the SQLite implementation of [`SnapshotStore`].

use std::path::Path;

use chrono::NaiveDate;
use rusqlite::OptionalExtension as _;
use vigil_core::{
  dataset::DatasetRecord,
  diff::Diff,
  metric::VolatilityMetric,
  snapshot::{ComputationResult, Snapshot},
  store::SnapshotStore,
};

use crate::{
  Error, Result,
  encode::{
    RawDataset, RawDiff, RawMetric, RawSnapshot, encode_availability,
    encode_date, encode_dt, encode_events, encode_metadata_changes,
    encode_schema, encode_schema_changes,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A vigil snapshot store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

const SNAPSHOT_COLUMNS: &str = "dataset_id, snapshot_date, created_at, \
   row_count, column_count, file_size, content_hash, schema_json, \
   availability, status_code, last_modified, \
   url, title, agency, license, publisher";

fn snapshot_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawSnapshot> {
  Ok(RawSnapshot {
    dataset_id:    row.get(0)?,
    snapshot_date: row.get(1)?,
    created_at:    row.get(2)?,
    row_count:     row.get(3)?,
    column_count:  row.get(4)?,
    file_size:     row.get(5)?,
    content_hash:  row.get(6)?,
    schema_json:   row.get(7)?,
    availability:  row.get(8)?,
    status_code:   row.get(9)?,
    last_modified: row.get(10)?,
    url:           row.get(11)?,
    title:         row.get(12)?,
    agency:        row.get(13)?,
    license:       row.get(14)?,
    publisher:     row.get(15)?,
  })
}

// ─── SnapshotStore impl ──────────────────────────────────────────────────────

impl SnapshotStore for SqliteStore {
  type Error = Error;

  // ── Catalog ───────────────────────────────────────────────────────────────

  async fn upsert_dataset(&self, record: DatasetRecord) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO datasets (dataset_id, url, declared_format, agency, title)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT (dataset_id) DO UPDATE SET
             url = excluded.url,
             declared_format = excluded.declared_format,
             agency = excluded.agency,
             title = excluded.title",
          rusqlite::params![
            record.dataset_id,
            record.url,
            record.declared_format,
            record.agency,
            record.title,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn select_candidates(&self, limit: usize) -> Result<Vec<DatasetRecord>> {
    let limit = limit as i64;

    let raws: Vec<RawDataset> = self
      .conn
      .call(move |conn| {
        // The "current" snapshot is the one with the maximum created_at
        // (row id breaks exact ties).
        let mut stmt = conn.prepare(
          "SELECT d.dataset_id, d.url, d.declared_format, d.agency, d.title
           FROM datasets d
           JOIN snapshots s ON s.snapshot_id = (
             SELECT snapshot_id FROM snapshots
             WHERE dataset_id = d.dataset_id
             ORDER BY created_at DESC, snapshot_id DESC
             LIMIT 1
           )
           WHERE d.url <> ''
             AND s.availability = 'available'
             AND (IFNULL(s.row_count, 0) = 0 OR IFNULL(s.column_count, 0) = 0)
           ORDER BY s.created_at DESC
           LIMIT ?1",
        )?;

        let rows = stmt
          .query_map(rusqlite::params![limit], |row| {
            Ok(RawDataset {
              dataset_id:      row.get(0)?,
              url:             row.get(1)?,
              declared_format: row.get(2)?,
              agency:          row.get(3)?,
              title:           row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
      })
      .await?;

    Ok(raws.into_iter().map(RawDataset::into_record).collect())
  }

  // ── Snapshots ─────────────────────────────────────────────────────────────

  async fn insert_snapshot(&self, snapshot: Snapshot) -> Result<i64> {
    let schema_json = snapshot.schema.as_ref().map(encode_schema).transpose()?;
    let date_str = encode_date(snapshot.snapshot_date);
    let at_str = encode_dt(snapshot.created_at);
    let avail_str = encode_availability(snapshot.availability).to_owned();

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO snapshots (
             dataset_id, snapshot_date, created_at,
             row_count, column_count, file_size, content_hash, schema_json,
             availability, status_code, last_modified,
             url, title, agency, license, publisher
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
          rusqlite::params![
            snapshot.dataset_id,
            date_str,
            at_str,
            snapshot.row_count,
            snapshot.column_count,
            snapshot.file_size,
            snapshot.content_hash,
            schema_json,
            avail_str,
            snapshot.status_code,
            snapshot.last_modified,
            snapshot.url,
            snapshot.title,
            snapshot.agency,
            snapshot.license,
            snapshot.publisher,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(id)
  }

  async fn get_snapshots(&self, dataset_id: &str) -> Result<Vec<Snapshot>> {
    let id = dataset_id.to_owned();

    let raws: Vec<RawSnapshot> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SNAPSHOT_COLUMNS} FROM snapshots
           WHERE dataset_id = ?1
           ORDER BY snapshot_date ASC, created_at ASC",
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id], snapshot_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSnapshot::into_snapshot).collect()
  }

  async fn list_dataset_ids(&self) -> Result<Vec<String>> {
    let ids = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT DISTINCT dataset_id FROM snapshots ORDER BY dataset_id",
        )?;
        let rows = stmt
          .query_map([], |row| row.get::<_, String>(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(ids)
  }

  async fn update_current_snapshot_dimensions(
    &self,
    dataset_id: &str,
    result: &ComputationResult,
  ) -> Result<()> {
    let id = dataset_id.to_owned();
    let schema_json = result.schema_info.as_ref().map(encode_schema).transpose()?;
    let row_count = result.row_count;
    let column_count = result.column_count;
    let file_size = result.file_size;
    // An empty hash means no content was retrieved; store NULL.
    let content_hash = if result.content_hash.is_empty() {
      None
    } else {
      Some(result.content_hash.clone())
    };

    let updated: bool = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let target: Option<i64> = tx
          .query_row(
            "SELECT snapshot_id FROM snapshots
             WHERE dataset_id = ?1
             ORDER BY created_at DESC, snapshot_id DESC
             LIMIT 1",
            rusqlite::params![id],
            |row| row.get(0),
          )
          .optional()?;

        let Some(snapshot_id) = target else {
          return Ok(false);
        };

        tx.execute(
          "UPDATE snapshots SET
             row_count = ?1, column_count = ?2, file_size = ?3,
             content_hash = ?4, schema_json = ?5
           WHERE snapshot_id = ?6",
          rusqlite::params![
            row_count,
            column_count,
            file_size,
            content_hash,
            schema_json,
            snapshot_id,
          ],
        )?;

        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !updated {
      return Err(Error::NoSnapshots(dataset_id.to_owned()));
    }
    Ok(())
  }

  // ── Diffs & metrics ───────────────────────────────────────────────────────

  async fn diff_exists(
    &self,
    dataset_id: &str,
    from_date: NaiveDate,
    to_date: NaiveDate,
  ) -> Result<bool> {
    let id = dataset_id.to_owned();
    let from_str = encode_date(from_date);
    let to_str = encode_date(to_date);

    let exists = self
      .conn
      .call(move |conn| {
        let exists: bool = conn
          .query_row(
            "SELECT 1 FROM diffs
             WHERE dataset_id = ?1 AND from_date = ?2 AND to_date = ?3",
            rusqlite::params![id, from_str, to_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        Ok(exists)
      })
      .await?;

    Ok(exists)
  }

  async fn insert_diff(&self, diff: &Diff) -> Result<i64> {
    let dataset_id = diff.dataset_id.clone();
    let from_str = encode_date(diff.from_date);
    let to_str = encode_date(diff.to_date);
    let metadata_json = encode_metadata_changes(&diff.metadata_changes)?;
    let schema_json = encode_schema_changes(&diff.schema_changes)?;
    let events_json = encode_events(&diff.change_events)?;
    let row_delta = diff.content_changes.row_count_delta;
    let column_delta = diff.content_changes.column_count_delta;
    let drift = diff.content_changes.content_drift;
    let score = diff.volatility_score;
    let now_str = encode_dt(chrono::Utc::now());

    let inserted = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO diffs (
             dataset_id, from_date, to_date,
             metadata_changes, schema_changes,
             row_count_delta, column_count_delta,
             content_drift, volatility_score, change_events, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
          rusqlite::params![
            dataset_id,
            from_str,
            to_str,
            metadata_json,
            schema_json,
            row_delta,
            column_delta,
            drift,
            score,
            events_json,
            now_str,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await;

    match inserted {
      Ok(id) => Ok(id),
      Err(tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(
        f,
        _,
      ))) if f.code == rusqlite::ErrorCode::ConstraintViolation => {
        Err(Error::DuplicateDiff {
          dataset_id: diff.dataset_id.clone(),
          from_date:  diff.from_date,
          to_date:    diff.to_date,
        })
      }
      Err(e) => Err(e.into()),
    }
  }

  async fn get_diff(
    &self,
    dataset_id: &str,
    from_date: NaiveDate,
    to_date: NaiveDate,
  ) -> Result<Option<Diff>> {
    let id = dataset_id.to_owned();
    let from_str = encode_date(from_date);
    let to_str = encode_date(to_date);

    let raw: Option<RawDiff> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT dataset_id, from_date, to_date,
                      metadata_changes, schema_changes,
                      row_count_delta, column_count_delta,
                      content_drift, volatility_score, change_events
               FROM diffs
               WHERE dataset_id = ?1 AND from_date = ?2 AND to_date = ?3",
              rusqlite::params![id, from_str, to_str],
              |row| {
                Ok(RawDiff {
                  dataset_id:         row.get(0)?,
                  from_date:          row.get(1)?,
                  to_date:            row.get(2)?,
                  metadata_changes:   row.get(3)?,
                  schema_changes:     row.get(4)?,
                  row_count_delta:    row.get(5)?,
                  column_count_delta: row.get(6)?,
                  content_drift:      row.get(7)?,
                  volatility_score:   row.get(8)?,
                  change_events:      row.get(9)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawDiff::into_diff).transpose()
  }

  async fn upsert_volatility_metric(
    &self,
    metric: &VolatilityMetric,
  ) -> Result<()> {
    let dataset_id = metric.dataset_id.clone();
    let date_str = encode_date(metric.snapshot_date);
    let events_json = encode_events(&metric.change_events)?;
    let m = metric.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO volatility_metrics (
             dataset_id, snapshot_date,
             volatility_score, schema_churn_rate, content_similarity,
             license_changed, url_changed, publisher_changed,
             row_count_delta, column_count_delta, change_events
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
           ON CONFLICT (dataset_id, snapshot_date) DO UPDATE SET
             volatility_score   = excluded.volatility_score,
             schema_churn_rate  = excluded.schema_churn_rate,
             content_similarity = excluded.content_similarity,
             license_changed    = excluded.license_changed,
             url_changed        = excluded.url_changed,
             publisher_changed  = excluded.publisher_changed,
             row_count_delta    = excluded.row_count_delta,
             column_count_delta = excluded.column_count_delta,
             change_events      = excluded.change_events",
          rusqlite::params![
            dataset_id,
            date_str,
            m.volatility_score,
            m.schema_churn_rate,
            m.content_similarity,
            m.license_changed,
            m.url_changed,
            m.publisher_changed,
            m.row_count_delta,
            m.column_count_delta,
            events_json,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(())
  }

  async fn get_volatility_metric(
    &self,
    dataset_id: &str,
    snapshot_date: NaiveDate,
  ) -> Result<Option<VolatilityMetric>> {
    let id = dataset_id.to_owned();
    let date_str = encode_date(snapshot_date);

    let raw: Option<RawMetric> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT dataset_id, snapshot_date,
                      volatility_score, schema_churn_rate, content_similarity,
                      license_changed, url_changed, publisher_changed,
                      row_count_delta, column_count_delta, change_events
               FROM volatility_metrics
               WHERE dataset_id = ?1 AND snapshot_date = ?2",
              rusqlite::params![id, date_str],
              |row| {
                Ok(RawMetric {
                  dataset_id:         row.get(0)?,
                  snapshot_date:      row.get(1)?,
                  volatility_score:   row.get(2)?,
                  schema_churn_rate:  row.get(3)?,
                  content_similarity: row.get(4)?,
                  license_changed:    row.get(5)?,
                  url_changed:        row.get(6)?,
                  publisher_changed:  row.get(7)?,
                  row_count_delta:    row.get(8)?,
                  column_count_delta: row.get(9)?,
                  change_events:      row.get(10)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawMetric::into_metric).transpose()
  }
}
