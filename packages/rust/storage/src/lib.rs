//! libSQL metadata store for ingested works.
//!
//! The [`Storage`] struct wraps a local libSQL database holding one
//! [`WorkRecord`] per ingested work plus a run-history table. The store is
//! the run's only shared mutable resource; every access is a single
//! read-then-write per candidate with no cross-step rollback.

mod migrations;

use std::path::Path;

use chrono::{DateTime, Utc};
use libsql::{Connection, Database, Row, params};
use uuid::Uuid;

use anthology_shared::{AnthologyError, Result, WorkRecord};

/// Outcome of a conditional work insert.
///
/// The novelty check and the insert are not one transaction; the uniqueness
/// constraint on `source_id` is what actually guards against double-insert
/// when two runs overlap. A constraint violation is "already exists, skip",
/// never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The record was inserted; this run is the first writer.
    Inserted,
    /// A record with this `source_id` already existed.
    AlreadyExists,
}

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl Storage {
    /// Open or create a database at `path`. Connection failure is fatal for
    /// the run.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AnthologyError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| AnthologyError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| AnthologyError::Storage(e.to_string()))?;

        let storage = Self { db, conn };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    AnthologyError::Storage(format!(
                        "migration v{} failed: {e}",
                        migration.version
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    // -----------------------------------------------------------------------
    // Work operations
    // -----------------------------------------------------------------------

    /// Find a work by its source id. The novelty check.
    pub async fn find_work(&self, source_id: &str) -> Result<Option<WorkRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT source_id, title, url, blob_key, excerpt, scraped_at, published, published_at
                 FROM works WHERE source_id = ?1",
                params![source_id],
            )
            .await
            .map_err(|e| AnthologyError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_work(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(AnthologyError::Storage(e.to_string())),
        }
    }

    /// Insert a new work record, conditional on `source_id` absence.
    ///
    /// A uniqueness violation maps to [`InsertOutcome::AlreadyExists`]
    /// rather than an error: first writer wins, later runs skip.
    pub async fn insert_work(&self, record: &WorkRecord) -> Result<InsertOutcome> {
        let result = self
            .conn
            .execute(
                "INSERT INTO works (source_id, title, url, blob_key, excerpt, scraped_at, published, published_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.source_id.as_str(),
                    record.title.as_str(),
                    record.url.as_str(),
                    record.blob_key.as_str(),
                    record.excerpt.as_str(),
                    record.scraped_at.to_rfc3339(),
                    record.published as i64,
                    record.published_at.map(|at| at.to_rfc3339()),
                ],
            )
            .await;

        match result {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(e) if e.to_string().contains("UNIQUE constraint failed") => {
                Ok(InsertOutcome::AlreadyExists)
            }
            Err(e) => Err(AnthologyError::Storage(e.to_string())),
        }
    }

    /// Mark a work as published. The record's one permitted state transition.
    pub async fn mark_published(&self, source_id: &str, at: DateTime<Utc>) -> Result<()> {
        self.conn
            .execute(
                "UPDATE works SET published = 1, published_at = ?1 WHERE source_id = ?2",
                params![at.to_rfc3339(), source_id],
            )
            .await
            .map_err(|e| AnthologyError::Storage(e.to_string()))?;
        Ok(())
    }

    /// List stored-but-unannounced works, oldest first. Feeds the
    /// pending-publish sweep.
    pub async fn list_unpublished(&self) -> Result<Vec<WorkRecord>> {
        self.query_works(
            "SELECT source_id, title, url, blob_key, excerpt, scraped_at, published, published_at
             FROM works WHERE published = 0 ORDER BY scraped_at",
        )
        .await
    }

    /// List all stored works, newest first.
    pub async fn list_works(&self) -> Result<Vec<WorkRecord>> {
        self.query_works(
            "SELECT source_id, title, url, blob_key, excerpt, scraped_at, published, published_at
             FROM works ORDER BY scraped_at DESC",
        )
        .await
    }

    async fn query_works(&self, sql: &str) -> Result<Vec<WorkRecord>> {
        let mut rows = self
            .conn
            .query(sql, params![])
            .await
            .map_err(|e| AnthologyError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_work(&row)?);
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Run history operations
    // -----------------------------------------------------------------------

    /// Insert a new ingest run. Returns the generated run id.
    pub async fn insert_ingest_run(&self) -> Result<String> {
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO ingest_runs (id, started_at) VALUES (?1, ?2)",
                params![id.as_str(), now.as_str()],
            )
            .await
            .map_err(|e| AnthologyError::Storage(e.to_string()))?;
        Ok(id)
    }

    /// Finish an ingest run with its stats.
    pub async fn finish_ingest_run(&self, run_id: &str, stats_json: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "UPDATE ingest_runs SET finished_at = ?1, stats_json = ?2 WHERE id = ?3",
                params![now.as_str(), stats_json, run_id],
            )
            .await
            .map_err(|e| AnthologyError::Storage(e.to_string()))?;
        Ok(())
    }
}

/// Convert a `works` row into a [`WorkRecord`].
fn row_to_work(row: &Row) -> Result<WorkRecord> {
    let get_text = |idx: i32| -> Result<String> {
        row.get::<String>(idx)
            .map_err(|e| AnthologyError::Storage(e.to_string()))
    };

    let scraped_at = parse_timestamp(&get_text(5)?)?;
    let published = row
        .get::<i64>(6)
        .map_err(|e| AnthologyError::Storage(e.to_string()))?
        != 0;
    // NULL published_at reads as an error; treat it as absent, like the
    // unannounced records it marks.
    let published_at = match row.get::<String>(7).ok() {
        Some(raw) => Some(parse_timestamp(&raw)?),
        None => None,
    };

    Ok(WorkRecord {
        source_id: get_text(0)?,
        title: get_text(1)?,
        url: get_text(2)?,
        blob_key: get_text(3)?,
        excerpt: get_text(4)?,
        scraped_at,
        published,
        published_at,
    })
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AnthologyError::Storage(format!("bad timestamp {raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anthology_shared::source_id;

    async fn temp_storage(tag: &str) -> (Storage, std::path::PathBuf) {
        let dir = std::env::temp_dir().join(format!("anthology-{tag}-{}", Uuid::now_v7()));
        let storage = Storage::open(&dir.join("test.db")).await.unwrap();
        (storage, dir)
    }

    fn sample_record(url: &str) -> WorkRecord {
        WorkRecord {
            source_id: source_id(url),
            title: "Осенний дождь".into(),
            url: url.into(),
            blob_key: "works/Осенний_дождь_20240501T000000Z.txt".into(),
            excerpt: "Дождь начался под вечер".into(),
            scraped_at: Utc::now(),
            published: false,
            published_at: None,
        }
    }

    #[tokio::test]
    async fn insert_then_find_roundtrip() {
        let (storage, dir) = temp_storage("roundtrip").await;
        let record = sample_record("http://samlib.ru/editors/p/popow_p_p/a.shtml");

        let outcome = storage.insert_work(&record).await.unwrap();
        assert_eq!(outcome, InsertOutcome::Inserted);

        let found = storage.find_work(&record.source_id).await.unwrap().unwrap();
        assert_eq!(found.title, record.title);
        assert_eq!(found.blob_key, record.blob_key);
        assert!(!found.published);
        assert!(found.published_at.is_none());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn find_unknown_returns_none() {
        let (storage, dir) = temp_storage("unknown").await;
        let found = storage.find_work(&source_id("http://nowhere/")).await.unwrap();
        assert!(found.is_none());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn duplicate_insert_reports_already_exists() {
        let (storage, dir) = temp_storage("dup").await;
        let record = sample_record("http://samlib.ru/editors/p/popow_p_p/b.shtml");

        assert_eq!(
            storage.insert_work(&record).await.unwrap(),
            InsertOutcome::Inserted
        );
        assert_eq!(
            storage.insert_work(&record).await.unwrap(),
            InsertOutcome::AlreadyExists
        );

        // Still exactly one record.
        assert_eq!(storage.list_works().await.unwrap().len(), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn mark_published_transitions_record() {
        let (storage, dir) = temp_storage("publish").await;
        let record = sample_record("http://samlib.ru/editors/p/popow_p_p/c.shtml");
        storage.insert_work(&record).await.unwrap();

        let at = Utc::now();
        storage.mark_published(&record.source_id, at).await.unwrap();

        let found = storage.find_work(&record.source_id).await.unwrap().unwrap();
        assert!(found.published);
        assert_eq!(
            found.published_at.unwrap().timestamp(),
            at.timestamp()
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn list_unpublished_filters_published() {
        let (storage, dir) = temp_storage("pending").await;

        let pending = sample_record("http://samlib.ru/editors/p/popow_p_p/d.shtml");
        let announced = sample_record("http://samlib.ru/editors/p/popow_p_p/e.shtml");
        storage.insert_work(&pending).await.unwrap();
        storage.insert_work(&announced).await.unwrap();
        storage
            .mark_published(&announced.source_id, Utc::now())
            .await
            .unwrap();

        let unpublished = storage.list_unpublished().await.unwrap();
        assert_eq!(unpublished.len(), 1);
        assert_eq!(unpublished[0].source_id, pending.source_id);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn ingest_run_lifecycle() {
        let (storage, dir) = temp_storage("runs").await;

        let run_id = storage.insert_ingest_run().await.unwrap();
        storage
            .finish_ingest_run(&run_id, r#"{"status":"done","new":3}"#)
            .await
            .unwrap();

        let _ = std::fs::remove_dir_all(&dir);
    }
}
