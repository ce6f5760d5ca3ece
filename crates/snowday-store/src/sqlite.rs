//! SQLite-backed key-value store.

use std::path::Path;

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use snowday_core::{RusqliteErrorExt, StorageError};

use crate::store::{KeyValueStore, StoreResult};

/// Durable store in a single `kv` table.
///
/// The connection is not `Sync`, so it sits behind a mutex.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`, creating parent directories.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Unavailable(format!(
                    "Failed to create {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let conn = Connection::open(path).map_err(|e| e.into_storage_error())?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        tracing::debug!("Opened key-value store at {}", path.display());
        Ok(store)
    }

    /// Create an in-memory database.
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| e.into_storage_error())?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        self.conn
            .lock()
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS kv (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at INTEGER NOT NULL
                );
                "#,
            )
            .map_err(|e| e.into_storage_error())
    }

    /// Number of stored keys.
    pub fn len(&self) -> StoreResult<usize> {
        let count: i64 = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM kv", [], |row| row.get(0))
            .map_err(|e| e.into_storage_error())?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Remove every key starting with `prefix`. Returns how many were removed.
    pub fn delete_prefix(&self, prefix: &str) -> StoreResult<usize> {
        let pattern = format!("{}%", escape_like(prefix));
        self.conn
            .lock()
            .execute(
                "DELETE FROM kv WHERE key LIKE ?1 ESCAPE '\\'",
                params![pattern],
            )
            .map_err(|e| e.into_storage_error())
    }
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.conn
            .lock()
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| e.into_storage_error())
    }

    fn put(&self, key: &str, value: &str) -> StoreResult<()> {
        let now = Utc::now().timestamp_millis();
        self.conn
            .lock()
            .execute(
                "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)",
                params![key, value, now],
            )
            .map_err(|e| e.into_storage_error())?;
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.conn
            .lock()
            .execute("DELETE FROM kv WHERE key = ?1", params![key])
            .map_err(|e| e.into_storage_error())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_put_and_get() {
        let store = SqliteStore::in_memory().unwrap();
        store.put("forecast:10001", "{\"a\":1}").unwrap();

        let value = store.get("forecast:10001").unwrap();
        assert_eq!(value.as_deref(), Some("{\"a\":1}"));
    }

    #[test]
    fn test_get_missing() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.get("nothing").unwrap().is_none());
    }

    #[test]
    fn test_put_replaces() {
        let store = SqliteStore::in_memory().unwrap();
        store.put("k", "1").unwrap();
        store.put("k", "2").unwrap();

        assert_eq!(store.get("k").unwrap().as_deref(), Some("2"));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_delete() {
        let store = SqliteStore::in_memory().unwrap();
        store.put("k", "1").unwrap();
        store.delete("k").unwrap();
        assert!(store.get("k").unwrap().is_none());
    }

    #[test]
    fn test_delete_prefix_leaves_other_keys() {
        let store = SqliteStore::in_memory().unwrap();
        store.put("snowday:forecast:a", "1").unwrap();
        store.put("snowday:forecast:b", "1").unwrap();
        store.put("snowday:votes:a", "1").unwrap();

        let removed = store.delete_prefix("snowday:forecast:").unwrap();
        assert_eq!(removed, 2);
        assert!(store.get("snowday:votes:a").unwrap().is_some());
    }

    #[test]
    fn test_delete_prefix_treats_wildcards_literally() {
        let store = SqliteStore::in_memory().unwrap();
        store.put("a_b", "1").unwrap();
        store.put("axb", "1").unwrap();

        let removed = store.delete_prefix("a_").unwrap();
        assert_eq!(removed, 1);
        assert!(store.get("axb").unwrap().is_some());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("snowday.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.put("snowday:votes:10001", "{\"closes\":1,\"opens\":0}").unwrap();
        }

        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(
            reopened.get("snowday:votes:10001").unwrap().as_deref(),
            Some("{\"closes\":1,\"opens\":0}")
        );
    }
}
