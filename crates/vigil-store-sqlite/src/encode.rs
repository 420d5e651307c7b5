//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, dates as ISO 8601 `YYYY-MM-DD`.
//! Structured fields (schema, change lists) are stored as compact JSON.

use chrono::{DateTime, NaiveDate, Utc};
use vigil_core::{
  dataset::{Availability, DatasetRecord},
  diff::{ContentChanges, Diff, MetadataChange, SchemaChange},
  metric::VolatilityMetric,
  snapshot::{SchemaInfo, Snapshot},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Availability ────────────────────────────────────────────────────────────

pub fn encode_availability(a: Availability) -> &'static str {
  match a {
    Availability::Available => "available",
    Availability::Unavailable => "unavailable",
    Availability::Unknown => "unknown",
  }
}

pub fn decode_availability(s: &str) -> Result<Availability> {
  match s {
    "available" => Ok(Availability::Available),
    "unavailable" => Ok(Availability::Unavailable),
    "unknown" => Ok(Availability::Unknown),
    other => Err(Error::Decode(format!("unknown availability: {other:?}"))),
  }
}

// ─── JSON columns ────────────────────────────────────────────────────────────

pub fn encode_schema(schema: &SchemaInfo) -> Result<String> {
  Ok(serde_json::to_string(schema)?)
}

pub fn decode_schema(s: &str) -> Result<SchemaInfo> {
  Ok(serde_json::from_str(s)?)
}

pub fn encode_metadata_changes(changes: &[MetadataChange]) -> Result<String> {
  Ok(serde_json::to_string(changes)?)
}

pub fn encode_schema_changes(changes: &[SchemaChange]) -> Result<String> {
  Ok(serde_json::to_string(changes)?)
}

pub fn encode_events(events: &[String]) -> Result<String> {
  Ok(serde_json::to_string(events)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `datasets` row.
pub struct RawDataset {
  pub dataset_id:      String,
  pub url:             String,
  pub declared_format: Option<String>,
  pub agency:          Option<String>,
  pub title:           Option<String>,
}

impl RawDataset {
  pub fn into_record(self) -> DatasetRecord {
    DatasetRecord {
      dataset_id:      self.dataset_id,
      url:             self.url,
      declared_format: self.declared_format,
      agency:          self.agency,
      title:           self.title,
    }
  }
}

/// Raw values read directly from a `snapshots` row.
pub struct RawSnapshot {
  pub dataset_id:    String,
  pub snapshot_date: String,
  pub created_at:    String,
  pub row_count:     Option<i64>,
  pub column_count:  Option<i64>,
  pub file_size:     Option<i64>,
  pub content_hash:  Option<String>,
  pub schema_json:   Option<String>,
  pub availability:  String,
  pub status_code:   Option<i64>,
  pub last_modified: Option<String>,
  pub url:           Option<String>,
  pub title:         Option<String>,
  pub agency:        Option<String>,
  pub license:       Option<String>,
  pub publisher:     Option<String>,
}

impl RawSnapshot {
  pub fn into_snapshot(self) -> Result<Snapshot> {
    let status_code = self
      .status_code
      .map(|c| {
        u16::try_from(c)
          .map_err(|_| Error::Decode(format!("status code out of range: {c}")))
      })
      .transpose()?;

    Ok(Snapshot {
      dataset_id:    self.dataset_id,
      snapshot_date: decode_date(&self.snapshot_date)?,
      created_at:    decode_dt(&self.created_at)?,
      row_count:     self.row_count,
      column_count:  self.column_count,
      file_size:     self.file_size,
      content_hash:  self.content_hash,
      schema:        self.schema_json.as_deref().map(decode_schema).transpose()?,
      availability:  decode_availability(&self.availability)?,
      status_code,
      last_modified: self.last_modified,
      url:           self.url,
      title:         self.title,
      agency:        self.agency,
      license:       self.license,
      publisher:     self.publisher,
    })
  }
}

/// Raw values read directly from a `diffs` row.
pub struct RawDiff {
  pub dataset_id:         String,
  pub from_date:          String,
  pub to_date:            String,
  pub metadata_changes:   String,
  pub schema_changes:     String,
  pub row_count_delta:    i64,
  pub column_count_delta: i64,
  pub content_drift:      f64,
  pub volatility_score:   f64,
  pub change_events:      String,
}

impl RawDiff {
  pub fn into_diff(self) -> Result<Diff> {
    Ok(Diff {
      dataset_id:       self.dataset_id,
      from_date:        decode_date(&self.from_date)?,
      to_date:          decode_date(&self.to_date)?,
      metadata_changes: serde_json::from_str(&self.metadata_changes)?,
      schema_changes:   serde_json::from_str(&self.schema_changes)?,
      content_changes:  ContentChanges {
        row_count_delta:    self.row_count_delta,
        column_count_delta: self.column_count_delta,
        content_drift:      self.content_drift,
      },
      volatility_score: self.volatility_score,
      change_events:    serde_json::from_str(&self.change_events)?,
    })
  }
}

/// Raw values read directly from a `volatility_metrics` row.
pub struct RawMetric {
  pub dataset_id:         String,
  pub snapshot_date:      String,
  pub volatility_score:   f64,
  pub schema_churn_rate:  f64,
  pub content_similarity: f64,
  pub license_changed:    bool,
  pub url_changed:        bool,
  pub publisher_changed:  bool,
  pub row_count_delta:    i64,
  pub column_count_delta: i64,
  pub change_events:      String,
}

impl RawMetric {
  pub fn into_metric(self) -> Result<VolatilityMetric> {
    Ok(VolatilityMetric {
      dataset_id:         self.dataset_id,
      snapshot_date:      decode_date(&self.snapshot_date)?,
      volatility_score:   self.volatility_score,
      schema_churn_rate:  self.schema_churn_rate,
      content_similarity: self.content_similarity,
      license_changed:    self.license_changed,
      url_changed:        self.url_changed,
      publisher_changed:  self.publisher_changed,
      row_count_delta:    self.row_count_delta,
      column_count_delta: self.column_count_delta,
      change_events:      serde_json::from_str(&self.change_events)?,
    })
  }
}
