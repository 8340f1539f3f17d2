//! Default locations and store bootstrap shared by the CLI and web server.

use crate::error::Result;
use crate::storage::SqliteStorage;
use crate::store::InventoryStore;
use skylander_common::PersistenceError;
use std::path::{Path, PathBuf};

pub use crate::share::DEFAULT_SHARE_BASE_URL;

/// Directory under the platform data dir holding the state database
pub const APP_DIR_NAME: &str = "skylander_tracker";
pub const DB_FILE_NAME: &str = "inventory.db";

/// Returns the default database path: ~/.local/share/skylander_tracker/inventory.db
pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
        .join(DB_FILE_NAME)
}

/// Open the SQLite-backed store at `db_path`, creating missing parent
/// directories first.
pub fn open_store(db_path: &Path) -> Result<InventoryStore<SqliteStorage>> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .map_err(|e| PersistenceError::Backend(Box::new(e)))?;
            log::info!("Created directory: {}", parent.display());
        }
    }

    let storage = SqliteStorage::open(db_path)?;
    InventoryStore::open(storage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FieldUpdate;
    use skylander_common::CatalogItem;
    use tempfile::TempDir;

    #[test]
    fn default_db_path_ends_with_app_dir() {
        let path = default_db_path();
        assert!(path.ends_with("skylander_tracker/inventory.db"));
    }

    #[test]
    fn open_store_creates_missing_directories() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join("deeper").join("inventory.db");

        let store = open_store(&db_path).unwrap();
        assert!(store.catalog().is_empty());
        assert!(db_path.exists());
    }

    #[test]
    fn open_store_restores_saved_state() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("inventory.db");

        {
            let mut store = open_store(&db_path).unwrap();
            store
                .import_catalog(vec![CatalogItem::new("tree-rex", "Tree Rex")])
                .unwrap();
            store.update_field("tree-rex", FieldUpdate::Count(3)).unwrap();
        }

        let store = open_store(&db_path).unwrap();
        assert_eq!(store.catalog().len(), 1);
        assert_eq!(store.record("tree-rex").count, 3);
    }
}
