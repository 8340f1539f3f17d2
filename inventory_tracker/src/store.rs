//! Inventory store: sole owner of the catalog, the inventory map and the
//! saved share views.
//!
//! Every mutation is applied in memory first and then written through the
//! persistence gateway as a full snapshot. A failed write is reported as
//! [`TrackerError::Persistence`] but the in-memory change stands.

use crate::error::{Result, TrackerError};
use crate::persistence::{InventoryMap, PersistenceGateway};
use crate::share::ShareDraft;
use crate::storage::StateStorage;
use crate::views::{record_or_default, InventoryView};
use chrono::{DateTime, Utc};
use skylander_common::{CatalogItem, InventoryRecord, SavedShareView};
use std::borrow::Cow;
use std::collections::HashSet;

/// A single-field change to an inventory record.
///
/// `currency` has no variant: it is never changed after creation.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    Have(bool),
    Need(bool),
    ForTrade(bool),
    Count(u32),
    Value(f64),
    Notes(String),
}

fn parse_bool(field: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Ok(true),
        "0" | "false" | "no" | "n" => Ok(false),
        _ => Err(TrackerError::invalid_value(field, raw)),
    }
}

fn checked_value(value: f64) -> Result<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(TrackerError::invalid_value("value", value))
    }
}

impl FieldUpdate {
    /// Build an update from a field name and text input.
    pub fn parse(field: &str, raw: &str) -> Result<Self> {
        match field {
            "have" => Ok(FieldUpdate::Have(parse_bool(field, raw)?)),
            "need" => Ok(FieldUpdate::Need(parse_bool(field, raw)?)),
            "forTrade" | "for_trade" => Ok(FieldUpdate::ForTrade(parse_bool(field, raw)?)),
            "count" => raw
                .trim()
                .parse::<u32>()
                .map(FieldUpdate::Count)
                .map_err(|_| TrackerError::invalid_value(field, raw)),
            "value" => {
                let value = raw
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| TrackerError::invalid_value(field, raw))?;
                Ok(FieldUpdate::Value(checked_value(value)?))
            }
            "notes" => Ok(FieldUpdate::Notes(raw.to_string())),
            other => Err(TrackerError::UnknownField(other.to_string())),
        }
    }

    /// Build an update from a loosely-typed JSON value.
    ///
    /// Strings are accepted for every field and go through [`FieldUpdate::parse`].
    pub fn from_json(field: &str, value: &serde_json::Value) -> Result<Self> {
        use serde_json::Value;

        match (field, value) {
            (_, Value::String(raw)) => Self::parse(field, raw),
            ("have", Value::Bool(b)) => Ok(FieldUpdate::Have(*b)),
            ("need", Value::Bool(b)) => Ok(FieldUpdate::Need(*b)),
            ("forTrade" | "for_trade", Value::Bool(b)) => Ok(FieldUpdate::ForTrade(*b)),
            ("count", Value::Number(n)) => n
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .map(FieldUpdate::Count)
                .ok_or_else(|| TrackerError::invalid_value(field, n)),
            ("value", Value::Number(n)) => {
                let value = n
                    .as_f64()
                    .ok_or_else(|| TrackerError::invalid_value(field, n))?;
                Ok(FieldUpdate::Value(checked_value(value)?))
            }
            ("have" | "need" | "forTrade" | "for_trade" | "count" | "value" | "notes", other) => {
                Err(TrackerError::invalid_value(field, other))
            }
            (other, _) => Err(TrackerError::UnknownField(other.to_string())),
        }
    }

    /// Field name as stored
    pub fn field_name(&self) -> &'static str {
        match self {
            FieldUpdate::Have(_) => "have",
            FieldUpdate::Need(_) => "need",
            FieldUpdate::ForTrade(_) => "forTrade",
            FieldUpdate::Count(_) => "count",
            FieldUpdate::Value(_) => "value",
            FieldUpdate::Notes(_) => "notes",
        }
    }

    fn apply(self, record: &mut InventoryRecord) {
        match self {
            FieldUpdate::Have(b) => record.have = b,
            FieldUpdate::Need(b) => record.need = b,
            FieldUpdate::ForTrade(b) => record.for_trade = b,
            FieldUpdate::Count(n) => record.count = n,
            FieldUpdate::Value(v) => record.value = v,
            FieldUpdate::Notes(s) => record.notes = s,
        }
    }
}

/// Catalog attribute usable in an equality query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogField {
    Id,
    Name,
    Element,
    Category,
    Game,
    ImageUrl,
    Link,
}

impl CatalogField {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "id" => Some(CatalogField::Id),
            "name" => Some(CatalogField::Name),
            "element" => Some(CatalogField::Element),
            "category" => Some(CatalogField::Category),
            "game" => Some(CatalogField::Game),
            "imageUrl" | "image" => Some(CatalogField::ImageUrl),
            "link" => Some(CatalogField::Link),
            _ => None,
        }
    }

    /// Field value, with absent optional fields reading as ""
    fn value<'a>(&self, item: &'a CatalogItem) -> &'a str {
        match self {
            CatalogField::Id => &item.id,
            CatalogField::Name => &item.name,
            CatalogField::Element => &item.element,
            CatalogField::Category => &item.category,
            CatalogField::Game => &item.game,
            CatalogField::ImageUrl => item.image_url.as_deref().unwrap_or(""),
            CatalogField::Link => item.link.as_deref().unwrap_or(""),
        }
    }
}

/// Conjunction of exact-match criteria over catalog fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemQuery {
    criteria: Vec<(CatalogField, String)>,
}

impl ItemQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, field: CatalogField, value: impl Into<String>) -> Self {
        self.criteria.push((field, value.into()));
        self
    }

    pub fn matches(&self, item: &CatalogItem) -> bool {
        self.criteria
            .iter()
            .all(|(field, value)| field.value(item) == value)
    }
}

/// Outcome of a catalog import
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    /// Items now in the catalog
    pub items: usize,
    /// Records created for ids seen for the first time
    pub new_records: usize,
    /// Items dropped because their id was already taken
    pub duplicates_dropped: usize,
}

pub struct InventoryStore<S: StateStorage> {
    catalog: Vec<CatalogItem>,
    inventory: InventoryMap,
    share_views: Vec<SavedShareView>,
    catalog_revision: u64,
    gateway: PersistenceGateway<S>,
}

impl<S: StateStorage> InventoryStore<S> {
    /// Load stored state from `storage`; nothing stored yields an empty store.
    pub fn open(storage: S) -> Result<Self> {
        let gateway = PersistenceGateway::new(storage);
        let state = gateway.load()?.unwrap_or_default();

        Ok(Self {
            catalog: state.catalog,
            inventory: state.inventory,
            share_views: state.share_views,
            catalog_revision: 0,
            gateway,
        })
    }

    pub fn catalog(&self) -> &[CatalogItem] {
        &self.catalog
    }

    pub fn inventory(&self) -> &InventoryMap {
        &self.inventory
    }

    pub fn item(&self, id: &str) -> Option<&CatalogItem> {
        self.catalog.iter().find(|item| item.id == id)
    }

    /// The record for `id`, or the zero-valued record if none exists yet
    pub fn record(&self, id: &str) -> Cow<'_, InventoryRecord> {
        record_or_default(&self.inventory, id)
    }

    pub fn view(&self) -> InventoryView<'_> {
        InventoryView::new(&self.catalog, &self.inventory)
    }

    /// Bumped by every import and reset.
    ///
    /// An async flow that captured the revision before suspending can compare
    /// it afterwards to detect that its result is stale.
    pub fn catalog_revision(&self) -> u64 {
        self.catalog_revision
    }

    pub fn storage(&self) -> &S {
        self.gateway.storage()
    }

    /// Erase the storage type, e.g. to share one store type across backends.
    pub fn boxed(self) -> InventoryStore<Box<dyn StateStorage + Send>>
    where
        S: Send + 'static,
    {
        let storage: Box<dyn StateStorage + Send> = Box::new(self.gateway.into_storage());
        InventoryStore {
            catalog: self.catalog,
            inventory: self.inventory,
            share_views: self.share_views,
            catalog_revision: self.catalog_revision,
            gateway: PersistenceGateway::new(storage),
        }
    }

    /// Replace the catalog wholesale.
    ///
    /// Ids seen for the first time get a zeroed record; existing records are
    /// kept so re-importing doesn't lose edits. Within `items`, the first
    /// occurrence of an id wins and later duplicates are dropped.
    pub fn import_catalog(&mut self, items: Vec<CatalogItem>) -> Result<ImportSummary> {
        let (summary, saved) = self.import_catalog_reporting(items);
        saved.map(|()| summary)
    }

    /// Same as [`InventoryStore::import_catalog`], but the summary of the
    /// applied import is returned even when saving it failed.
    pub fn import_catalog_reporting(
        &mut self,
        items: Vec<CatalogItem>,
    ) -> (ImportSummary, Result<()>) {
        let mut seen = HashSet::with_capacity(items.len());
        let mut catalog = Vec::with_capacity(items.len());
        let mut summary = ImportSummary::default();

        for item in items {
            if !seen.insert(item.id.clone()) {
                log::warn!("Dropping duplicate catalog id '{}' ({})", item.id, item.name);
                summary.duplicates_dropped += 1;
                continue;
            }
            catalog.push(item);
        }

        for item in &catalog {
            if !self.inventory.contains_key(&item.id) {
                self.inventory
                    .insert(item.id.clone(), InventoryRecord::zeroed());
                summary.new_records += 1;
            }
        }

        summary.items = catalog.len();
        self.catalog = catalog;
        self.catalog_revision += 1;

        log::info!(
            "Imported catalog: {} items, {} new records, {} duplicates dropped",
            summary.items,
            summary.new_records,
            summary.duplicates_dropped
        );

        let saved = self.persist();
        (summary, saved)
    }

    /// Set one field on the record for `id`, creating the record first if needed.
    pub fn update_field(&mut self, id: &str, update: FieldUpdate) -> Result<()> {
        log::debug!("Updating {} on '{}'", update.field_name(), id);
        let record = self.inventory.entry(id.to_string()).or_default();
        update.apply(record);
        self.persist()
    }

    /// Mark `id` as owned and add one copy. Each call adds another copy.
    pub fn add_to_inventory(&mut self, id: &str) -> Result<()> {
        let record = self.inventory.entry(id.to_string()).or_default();
        record.have = true;
        record.count = record.count.saturating_add(1);
        log::info!("Added '{}' to inventory (count now {})", id, record.count);
        self.persist()
    }

    /// Reset every catalog item's record to the zeroed default.
    ///
    /// Records for ids no longer in the catalog are discarded.
    pub fn reset_all(&mut self) -> Result<()> {
        self.inventory = self
            .catalog
            .iter()
            .map(|item| (item.id.clone(), InventoryRecord::zeroed()))
            .collect();
        self.catalog_revision += 1;
        log::info!("Reset inventory for {} items", self.catalog.len());
        self.persist()
    }

    /// Catalog items matching every criterion, in catalog order
    pub fn query(&self, query: &ItemQuery) -> Vec<&CatalogItem> {
        self.catalog
            .iter()
            .filter(|item| query.matches(item))
            .collect()
    }

    pub fn share_views(&self) -> &[SavedShareView] {
        &self.share_views
    }

    pub fn share_view(&self, id: &str) -> Option<&SavedShareView> {
        self.share_views.iter().find(|view| view.id == id)
    }

    /// Save the draft as a new share view stamped with the current time.
    pub fn save_share_view(&mut self, draft: &ShareDraft) -> Result<SavedShareView> {
        self.save_share_view_at(draft, Utc::now())
    }

    /// Save the draft as a new share view created at `now`.
    ///
    /// The id is the creation time in milliseconds, bumped until unique.
    pub fn save_share_view_at(
        &mut self,
        draft: &ShareDraft,
        now: DateTime<Utc>,
    ) -> Result<SavedShareView> {
        let mut millis = now.timestamp_millis();
        while self.share_view(&millis.to_string()).is_some() {
            millis += 1;
        }

        let view = SavedShareView {
            id: millis.to_string(),
            title: draft.title.clone(),
            description: draft.description.clone(),
            show_values: draft.show_values,
            selected_ids: draft.unique_ids().into_iter().map(str::to_string).collect(),
            created_at: now,
        };

        self.share_views.push(view.clone());
        log::info!("Saved share view '{}' ({})", view.title, view.id);

        self.persist_share_views()?;
        Ok(view)
    }

    /// Delete a saved share view. Returns false if no view has this id.
    pub fn delete_share_view(&mut self, id: &str) -> Result<bool> {
        let before = self.share_views.len();
        self.share_views.retain(|view| view.id != id);

        if self.share_views.len() == before {
            return Ok(false);
        }

        log::info!("Deleted share view {}", id);
        self.persist_share_views()?;
        Ok(true)
    }

    fn persist(&mut self) -> Result<()> {
        self.gateway
            .save(&self.catalog, &self.inventory)
            .map_err(|e| {
                log::warn!("Inventory change kept in memory but not saved: {}", e);
                TrackerError::Persistence(e)
            })
    }

    fn persist_share_views(&mut self) -> Result<()> {
        self.gateway
            .save_share_views(&self.share_views)
            .map_err(|e| {
                log::warn!("Share views kept in memory but not saved: {}", e);
                TrackerError::Persistence(e)
            })
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
