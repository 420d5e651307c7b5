//! SQL schema for the vigil SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Catalog records, owned by the external catalog sync.
CREATE TABLE IF NOT EXISTS datasets (
    dataset_id      TEXT PRIMARY KEY,
    url             TEXT NOT NULL DEFAULT '',
    declared_format TEXT,
    agency          TEXT,
    title           TEXT
);

-- Snapshots are append-only. The only UPDATE ever issued against this table
-- is the dimension back-fill of a dataset's current (max created_at) row.
CREATE TABLE IF NOT EXISTS snapshots (
    snapshot_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    dataset_id    TEXT NOT NULL REFERENCES datasets(dataset_id),
    snapshot_date TEXT NOT NULL,     -- ISO 8601 date
    created_at    TEXT NOT NULL,     -- RFC 3339 UTC
    row_count     INTEGER,
    column_count  INTEGER,
    file_size     INTEGER,
    content_hash  TEXT,              -- hex SHA-256 or NULL
    schema_json   TEXT,              -- serialized SchemaInfo or NULL
    availability  TEXT NOT NULL DEFAULT 'unknown',
    status_code   INTEGER,
    last_modified TEXT,
    url           TEXT,
    title         TEXT,
    agency        TEXT,
    license       TEXT,
    publisher     TEXT
);

-- At most one diff per snapshot pair; never mutated after insert.
CREATE TABLE IF NOT EXISTS diffs (
    diff_id            INTEGER PRIMARY KEY AUTOINCREMENT,
    dataset_id         TEXT NOT NULL,
    from_date          TEXT NOT NULL,
    to_date            TEXT NOT NULL,
    metadata_changes   TEXT NOT NULL DEFAULT '[]',
    schema_changes     TEXT NOT NULL DEFAULT '[]',
    row_count_delta    INTEGER NOT NULL DEFAULT 0,
    column_count_delta INTEGER NOT NULL DEFAULT 0,
    content_drift      REAL NOT NULL DEFAULT 0,
    volatility_score   REAL NOT NULL DEFAULT 0,
    change_events      TEXT NOT NULL DEFAULT '[]',
    created_at         TEXT NOT NULL,
    UNIQUE (dataset_id, from_date, to_date)
);

-- One metric row per (dataset, snapshot_date); replaced wholesale on upsert.
CREATE TABLE IF NOT EXISTS volatility_metrics (
    dataset_id         TEXT NOT NULL,
    snapshot_date      TEXT NOT NULL,
    volatility_score   REAL NOT NULL,
    schema_churn_rate  REAL NOT NULL,
    content_similarity REAL NOT NULL,
    license_changed    INTEGER NOT NULL DEFAULT 0,
    url_changed        INTEGER NOT NULL DEFAULT 0,
    publisher_changed  INTEGER NOT NULL DEFAULT 0,
    row_count_delta    INTEGER NOT NULL DEFAULT 0,
    column_count_delta INTEGER NOT NULL DEFAULT 0,
    change_events      TEXT NOT NULL DEFAULT '[]',
    PRIMARY KEY (dataset_id, snapshot_date)
);

CREATE INDEX IF NOT EXISTS snapshots_dataset_idx ON snapshots(dataset_id);
CREATE INDEX IF NOT EXISTS snapshots_current_idx ON snapshots(dataset_id, created_at);
CREATE INDEX IF NOT EXISTS diffs_dataset_idx     ON diffs(dataset_id);

PRAGMA user_version = 1;
";
