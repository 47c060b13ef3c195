//! SQL migration definitions for the Anthology metadata store.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a set of SQL statements executed as one batch.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: works, ingest_runs",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One row per ingested work. source_id is the SHA-256 of the work URL;
-- the PRIMARY KEY makes the novelty insert conditional on absence, so
-- racing runs cannot double-insert the same URL.
CREATE TABLE IF NOT EXISTS works (
    source_id    TEXT PRIMARY KEY,
    title        TEXT NOT NULL,
    url          TEXT NOT NULL,
    blob_key     TEXT NOT NULL,
    excerpt      TEXT NOT NULL,
    scraped_at   TEXT NOT NULL,
    published    INTEGER NOT NULL DEFAULT 0,
    published_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_works_published ON works(published);

-- Run history
CREATE TABLE IF NOT EXISTS ingest_runs (
    id          TEXT PRIMARY KEY,
    started_at  TEXT NOT NULL,
    finished_at TEXT,
    stats_json  TEXT
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
