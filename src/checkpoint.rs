//! Checkpoint Store
//!
//! SQLite-backed persistence of per-unit synthesis outcomes, keyed by
//! (root identity, budget, unit id). A resumed run loads the store and
//! skips units already completed under the same root and budget; a
//! changed budget changes unit membership, so its records simply never
//! match.
//!
//! Reads degrade: a row that cannot be decoded is treated as absent so
//! the unit regenerates. Writes are transactional and surface failures
//! as checkpoint errors.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{DocError, Result};

/// Terminal status of one unit's synthesis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStatus {
    Completed,
    Failed,
}

impl UnitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// One persisted unit outcome
#[derive(Debug, Clone)]
pub struct CheckpointRecord {
    pub unit_id: String,
    pub status: UnitStatus,
    /// Generated documentation; present only for completed units
    pub doc_text: Option<String>,
    pub retry_count: u32,
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS checkpoints (
    root_identity TEXT NOT NULL,
    budget INTEGER NOT NULL,
    unit_id TEXT NOT NULL,
    status TEXT NOT NULL,
    doc_text TEXT,
    retry_count INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (root_identity, budget, unit_id)
);
";

/// Pooled SQLite store for synthesis checkpoints
#[derive(Clone)]
pub struct CheckpointStore {
    pool: Pool<SqliteConnectionManager>,
}

impl CheckpointStore {
    /// Open (and create if needed) the store at the given path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            Ok(())
        });

        let pool = Pool::builder()
            .max_size(4)
            .build(manager)
            .map_err(|e| DocError::Checkpoint(format!("Failed to open store: {}", e)))?;

        let conn = get_conn(&pool)?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| DocError::Checkpoint(format!("Failed to create schema: {}", e)))?;

        Ok(Self { pool })
    }

    /// Load all records for a (root, budget) namespace.
    ///
    /// Undecodable rows are skipped with a warning, which makes the unit
    /// regenerate rather than fail the run.
    pub fn load(&self, root_identity: &str, budget: usize) -> Result<HashMap<String, CheckpointRecord>> {
        let conn = get_conn(&self.pool)?;
        let mut stmt = conn
            .prepare(
                "SELECT unit_id, status, doc_text, retry_count
                 FROM checkpoints
                 WHERE root_identity = ?1 AND budget = ?2",
            )
            .map_err(|e| DocError::Checkpoint(format!("Failed to query checkpoints: {}", e)))?;

        let rows = stmt
            .query_map(params![root_identity, budget as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })
            .map_err(|e| DocError::Checkpoint(format!("Failed to read checkpoints: {}", e)))?;

        let mut records = HashMap::new();
        for row in rows {
            let (unit_id, status_str, doc_text, retry_count) = match row {
                Ok(r) => r,
                Err(e) => {
                    warn!("Skipping undecodable checkpoint row: {}", e);
                    continue;
                }
            };
            let Some(status) = UnitStatus::parse(&status_str) else {
                warn!(unit_id = %unit_id, status = %status_str, "Skipping checkpoint with unknown status");
                continue;
            };
            if status == UnitStatus::Completed && doc_text.is_none() {
                warn!(unit_id = %unit_id, "Skipping completed checkpoint with no text");
                continue;
            }
            records.insert(
                unit_id.clone(),
                CheckpointRecord {
                    unit_id,
                    status,
                    doc_text,
                    retry_count: retry_count.max(0) as u32,
                },
            );
        }

        debug!(count = records.len(), "Loaded checkpoints");
        Ok(records)
    }

    /// Persist one unit outcome, replacing any previous record
    pub fn record(
        &self,
        root_identity: &str,
        budget: usize,
        record: &CheckpointRecord,
    ) -> Result<()> {
        let mut conn = get_conn(&self.pool)?;
        let tx = conn
            .transaction()
            .map_err(|e| DocError::Checkpoint(format!("Failed to begin transaction: {}", e)))?;

        tx.execute(
            "INSERT OR REPLACE INTO checkpoints
                 (root_identity, budget, unit_id, status, doc_text, retry_count, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                root_identity,
                budget as i64,
                record.unit_id,
                record.status.as_str(),
                record.doc_text,
                record.retry_count as i64,
                chrono::Utc::now().to_rfc3339(),
            ],
        )
        .map_err(|e| DocError::Checkpoint(format!("Failed to write checkpoint: {}", e)))?;

        tx.commit()
            .map_err(|e| DocError::Checkpoint(format!("Failed to commit checkpoint: {}", e)))?;
        Ok(())
    }

    /// Delete all records for a (root, budget) namespace; returns the
    /// number of rows removed
    pub fn clear(&self, root_identity: &str, budget: usize) -> Result<usize> {
        let conn = get_conn(&self.pool)?;
        let removed = conn
            .execute(
                "DELETE FROM checkpoints WHERE root_identity = ?1 AND budget = ?2",
                params![root_identity, budget as i64],
            )
            .map_err(|e| DocError::Checkpoint(format!("Failed to clear checkpoints: {}", e)))?;
        Ok(removed)
    }
}

fn get_conn(
    pool: &Pool<SqliteConnectionManager>,
) -> Result<r2d2::PooledConnection<SqliteConnectionManager>> {
    pool.get()
        .map_err(|e| DocError::Checkpoint(format!("Connection pool exhausted: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> CheckpointStore {
        CheckpointStore::open(&dir.path().join("checkpoints.db")).unwrap()
    }

    fn completed(unit_id: &str, text: &str) -> CheckpointRecord {
        CheckpointRecord {
            unit_id: unit_id.to_string(),
            status: UnitStatus::Completed,
            doc_text: Some(text.to_string()),
            retry_count: 0,
        }
    }

    #[test]
    fn test_record_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store.record("root-a", 40_000, &completed("u1", "docs")).unwrap();
        let records = store.load("root-a", 40_000).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records["u1"].doc_text.as_deref(), Some("docs"));
        assert_eq!(records["u1"].status, UnitStatus::Completed);
    }

    #[test]
    fn test_namespaces_are_isolated() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store.record("root-a", 40_000, &completed("u1", "a")).unwrap();
        assert!(store.load("root-b", 40_000).unwrap().is_empty());
        assert!(store.load("root-a", 20_000).unwrap().is_empty());
    }

    #[test]
    fn test_replace_updates_record() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store
            .record(
                "root-a",
                40_000,
                &CheckpointRecord {
                    unit_id: "u1".to_string(),
                    status: UnitStatus::Failed,
                    doc_text: None,
                    retry_count: 3,
                },
            )
            .unwrap();
        store.record("root-a", 40_000, &completed("u1", "second try")).unwrap();

        let records = store.load("root-a", 40_000).unwrap();
        assert_eq!(records["u1"].status, UnitStatus::Completed);
        assert_eq!(records["u1"].doc_text.as_deref(), Some("second try"));
    }

    #[test]
    fn test_corrupt_status_treated_as_absent() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.record("root-a", 40_000, &completed("u1", "ok")).unwrap();

        {
            let conn = get_conn(&store.pool).unwrap();
            conn.execute(
                "UPDATE checkpoints SET status = 'garbled' WHERE unit_id = 'u1'",
                [],
            )
            .unwrap();
        }

        assert!(store.load("root-a", 40_000).unwrap().is_empty());
    }

    #[test]
    fn test_clear_removes_only_namespace() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.record("root-a", 40_000, &completed("u1", "a")).unwrap();
        store.record("root-b", 40_000, &completed("u2", "b")).unwrap();

        assert_eq!(store.clear("root-a", 40_000).unwrap(), 1);
        assert!(store.load("root-a", 40_000).unwrap().is_empty());
        assert_eq!(store.load("root-b", 40_000).unwrap().len(), 1);
    }
}
