//! Durable local state medium.
//!
//! A plain string key/value store, the way a browser's local storage behaves.
//! [`SqliteStorage`] keeps the values in a single SQLite table on disk;
//! [`MemoryStorage`] keeps them in process and can enforce a byte quota.

use rusqlite::{params, Connection, OptionalExtension};
use skylander_common::PersistenceError;
use std::collections::HashMap;
use std::path::Path;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, PersistenceError>;

/// String key/value medium the persistence gateway writes through.
pub trait StateStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;
    fn set_item(&mut self, key: &str, value: &str) -> StorageResult<()>;
    fn remove_item(&mut self, key: &str) -> StorageResult<()>;

    /// Write several keys as one unit: either all land or none do.
    fn set_items(&mut self, items: &[(&str, &str)]) -> StorageResult<()>;
}

impl<T: StateStorage + ?Sized> StateStorage for Box<T> {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&mut self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&mut self, key: &str) -> StorageResult<()> {
        (**self).remove_item(key)
    }

    fn set_items(&mut self, items: &[(&str, &str)]) -> StorageResult<()> {
        (**self).set_items(items)
    }
}

fn backend(err: rusqlite::Error) -> PersistenceError {
    PersistenceError::Backend(Box::new(err))
}

/// Key/value storage in a SQLite database file
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Open (or create) the database at `path` and initialise the schema.
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let conn = Connection::open(path.as_ref()).map_err(backend)?;
        log::info!("Opened state database: {}", path.as_ref().display());
        Self::from_connection(conn)
    }

    /// In-memory database, gone when dropped.
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory().map_err(backend)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> StorageResult<Self> {
        init_schema(&conn).map_err(backend)?;
        Ok(Self { conn })
    }

    /// Number of stored keys
    pub fn len(&self) -> StorageResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM local_storage", [], |row| row.get(0))
            .map_err(backend)?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }
}

/// Creates the `local_storage` table if it does not already exist.
fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS local_storage (
            key        TEXT NOT NULL PRIMARY KEY,
            value      TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
}

const UPSERT_SQL: &str = "INSERT INTO local_storage (key, value, updated_at)
     VALUES (?1, ?2, datetime('now'))
     ON CONFLICT(key) DO UPDATE SET
         value      = excluded.value,
         updated_at = excluded.updated_at";

impl StateStorage for SqliteStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM local_storage WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(backend)
    }

    fn set_item(&mut self, key: &str, value: &str) -> StorageResult<()> {
        self.conn
            .execute(UPSERT_SQL, params![key, value])
            .map_err(backend)?;
        log::debug!("Stored '{}' ({} bytes)", key, value.len());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> StorageResult<()> {
        self.conn
            .execute("DELETE FROM local_storage WHERE key = ?1", params![key])
            .map_err(backend)?;
        Ok(())
    }

    fn set_items(&mut self, items: &[(&str, &str)]) -> StorageResult<()> {
        let tx = self.conn.transaction().map_err(backend)?;
        {
            let mut stmt = tx.prepare(UPSERT_SQL).map_err(backend)?;
            for &(key, value) in items {
                stmt.execute(params![key, value]).map_err(backend)?;
            }
        }
        tx.commit().map_err(backend)?;
        log::debug!("Stored {} keys in one transaction", items.len());
        Ok(())
    }
}

/// In-process key/value storage with an optional byte quota
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    items: HashMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that rejects writes once keys plus values exceed `quota` bytes.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            items: HashMap::new(),
            quota: Some(quota),
        }
    }

    fn used_bytes_without(&self, keys: &[&str]) -> usize {
        self.items
            .iter()
            .filter(|(k, _)| !keys.contains(&k.as_str()))
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl StateStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> StorageResult<()> {
        self.set_items(&[(key, value)])
    }

    fn remove_item(&mut self, key: &str) -> StorageResult<()> {
        self.items.remove(key);
        Ok(())
    }

    fn set_items(&mut self, items: &[(&str, &str)]) -> StorageResult<()> {
        if let Some(quota) = self.quota {
            let keys: Vec<&str> = items.iter().map(|(key, _)| *key).collect();
            let needed = self.used_bytes_without(&keys)
                + items
                    .iter()
                    .map(|(key, value)| key.len() + value.len())
                    .sum::<usize>();
            if needed > quota {
                return Err(PersistenceError::QuotaExceeded {
                    key: keys.join(", "),
                    needed,
                    quota,
                });
            }
        }
        for &(key, value) in items {
            self.items.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }
}
