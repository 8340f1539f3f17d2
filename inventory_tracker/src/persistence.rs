//! Persistence gateway: the only code that touches the storage medium.
//!
//! State is mirrored as full JSON snapshots under fixed keys. A schema
//! version is written alongside so later format changes can migrate old
//! data forward instead of misreading it.

use crate::storage::{StateStorage, StorageResult};
use serde::de::DeserializeOwned;
use skylander_common::{CatalogItem, InventoryRecord, PersistenceError, SavedShareView};
use std::collections::BTreeMap;

/// Key holding the catalog array
pub const CATALOG_KEY: &str = "skylanders";
/// Key holding the inventory map (id -> record)
pub const INVENTORY_KEY: &str = "userInventory";
/// Key holding the saved share views array
pub const SHARE_VIEWS_KEY: &str = "savedShareViews";
/// Key holding the schema version of the stored state
pub const SCHEMA_VERSION_KEY: &str = "schemaVersion";

/// Version written by this build
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Inventory map, ordered by id so snapshots serialize deterministically
pub type InventoryMap = BTreeMap<String, InventoryRecord>;

/// Everything read back from storage at startup
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PersistedState {
    pub catalog: Vec<CatalogItem>,
    pub inventory: InventoryMap,
    pub share_views: Vec<SavedShareView>,
}

pub struct PersistenceGateway<S: StateStorage> {
    storage: S,
}

impl<S: StateStorage> PersistenceGateway<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Read the stored state.
    ///
    /// Returns `Ok(None)` when nothing has been stored yet. Data written
    /// before the version tag existed is read as version 0.
    pub fn load(&self) -> StorageResult<Option<PersistedState>> {
        let catalog: Option<Vec<CatalogItem>> = self.read_json(CATALOG_KEY)?;
        let inventory: Option<InventoryMap> = self.read_json(INVENTORY_KEY)?;
        let share_views: Option<Vec<SavedShareView>> = self.read_json(SHARE_VIEWS_KEY)?;

        if catalog.is_none() && inventory.is_none() && share_views.is_none() {
            log::info!("No stored state found, starting empty");
            return Ok(None);
        }

        let version = self.stored_version()?;
        if version > CURRENT_SCHEMA_VERSION {
            return Err(PersistenceError::UnsupportedVersion {
                found: version,
                supported: CURRENT_SCHEMA_VERSION,
            });
        }

        let state = migrate(
            version,
            PersistedState {
                catalog: catalog.unwrap_or_default(),
                inventory: inventory.unwrap_or_default(),
                share_views: share_views.unwrap_or_default(),
            },
        );

        log::info!(
            "Loaded {} catalog items, {} inventory records, {} share views (schema v{})",
            state.catalog.len(),
            state.inventory.len(),
            state.share_views.len(),
            version
        );
        Ok(Some(state))
    }

    /// Write a full snapshot of the catalog and inventory.
    ///
    /// Both keys and the version tag are written as one batch, so a failed
    /// save never leaves a new catalog next to an old inventory.
    pub fn save(&mut self, catalog: &[CatalogItem], inventory: &InventoryMap) -> StorageResult<()> {
        let catalog_json = serde_json::to_string(catalog)?;
        let inventory_json = serde_json::to_string(inventory)?;
        let version = CURRENT_SCHEMA_VERSION.to_string();

        self.storage.set_items(&[
            (CATALOG_KEY, catalog_json.as_str()),
            (INVENTORY_KEY, inventory_json.as_str()),
            (SCHEMA_VERSION_KEY, version.as_str()),
        ])?;

        log::debug!(
            "Saved {} catalog items and {} inventory records",
            catalog.len(),
            inventory.len()
        );
        Ok(())
    }

    /// Write the whole saved share view collection.
    pub fn save_share_views(&mut self, views: &[SavedShareView]) -> StorageResult<()> {
        let json = serde_json::to_string(views)?;
        let version = CURRENT_SCHEMA_VERSION.to_string();
        self.storage.set_items(&[
            (SHARE_VIEWS_KEY, json.as_str()),
            (SCHEMA_VERSION_KEY, version.as_str()),
        ])?;
        log::debug!("Saved {} share views", views.len());
        Ok(())
    }

    fn stored_version(&self) -> StorageResult<u32> {
        match self.storage.get_item(SCHEMA_VERSION_KEY)? {
            None => Ok(0),
            Some(raw) => serde_json::from_str(raw.trim()).map_err(|source| {
                PersistenceError::Corrupt {
                    key: SCHEMA_VERSION_KEY.to_string(),
                    source,
                }
            }),
        }
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        match self.storage.get_item(key)? {
            None => Ok(None),
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|source| PersistenceError::Corrupt {
                    key: key.to_string(),
                    source,
                }),
        }
    }
}

/// Bring state read at `version` up to [`CURRENT_SCHEMA_VERSION`].
fn migrate(version: u32, state: PersistedState) -> PersistedState {
    match version {
        0 => {
            // Untagged data has the same layout as v1; records written
            // partially are completed by the serde defaults on read.
            log::info!("Migrating untagged stored state to schema v1");
            state
        }
        _ => state,
    }
}
