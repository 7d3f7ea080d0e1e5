//! SQLite-backed history storage.

use std::path::Path;

use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use crate::error::StoreError;
use crate::store::{HistoryStore, StoreResult};

/// Key-value table in a SQLite database with a byte quota over all values.
pub struct SqliteStore {
    conn: Connection,
    capacity: usize,
}

impl SqliteStore {
    /// Open (or create) a store at the given path.
    pub fn new<P: AsRef<Path>>(path: P, capacity: usize) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::backend(format!(
                    "Failed to create history directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        let conn = Connection::open(path)?;
        let store = Self { conn, capacity };
        store.init_schema()?;
        tracing::debug!("Opened history store at {}", path.display());
        Ok(store)
    }

    /// Create an in-memory store.
    pub fn in_memory(capacity: usize) -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn, capacity };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes currently used by all values.
    pub fn used_bytes(&self) -> StoreResult<usize> {
        let used: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(LENGTH(CAST(value AS BLOB))), 0) FROM kv",
            [],
            |row| row.get(0),
        )?;
        Ok(used.max(0) as usize)
    }
}

/// A full database file is a capacity failure like any quota rejection.
fn write_error(err: rusqlite::Error, needed: usize, capacity: usize) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::DiskFull => {
            StoreError::CapacityExceeded { needed, capacity }
        }
        _ => StoreError::Database(err),
    }
}

impl HistoryStore for SqliteStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
        let capacity = self.capacity;
        let tx = self.conn.transaction()?;

        let others: i64 = tx.query_row(
            "SELECT COALESCE(SUM(LENGTH(CAST(value AS BLOB))), 0) FROM kv WHERE key != ?1",
            params![key],
            |row| row.get(0),
        )?;
        let needed = others.max(0) as usize + value.len();
        if needed > capacity {
            return Err(StoreError::CapacityExceeded { needed, capacity });
        }

        let now = chrono::Utc::now().timestamp_millis();
        let written = tx
            .execute(
                "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)",
                params![key, value, now],
            )
            .and_then(|_| tx.commit());

        written.map_err(|e| write_error(e, needed, capacity))
    }

    fn remove(&mut self, key: &str) -> StoreResult<()> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}
