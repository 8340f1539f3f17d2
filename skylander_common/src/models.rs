//! Catalog, inventory and share-view records.
//!
//! Field names serialize in camelCase so persisted state and share payloads
//! keep the layout the browser front-end reads and writes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder used when an imported row has no usable name.
pub const DEFAULT_NAME: &str = "Unknown Skylander";
/// Placeholder used when an imported row has no element.
pub const DEFAULT_ELEMENT: &str = "Unknown";
/// Placeholder used when an imported row has no category.
pub const DEFAULT_CATEGORY: &str = "Figure";
/// Placeholder used when an imported row has no game.
pub const DEFAULT_GAME: &str = "Unknown Game";
/// Currency every inventory record is valued in.
pub const DEFAULT_CURRENCY: &str = "USD";
/// Prefix of ids synthesized for rows without an `id` column value.
pub const SYNTHETIC_ID_PREFIX: &str = "skylander-";

/// A single collectible in the catalog.
///
/// Immutable once imported; a re-import replaces the whole catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
    pub element: String,
    pub category: String,
    pub game: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl CatalogItem {
    /// Creates an item with the placeholder element, category and game.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            element: DEFAULT_ELEMENT.to_string(),
            category: DEFAULT_CATEGORY.to_string(),
            game: DEFAULT_GAME.to_string(),
            image_url: None,
            link: None,
        }
    }

    /// Builder-style setter for the element.
    pub fn with_element(mut self, element: impl Into<String>) -> Self {
        self.element = element.into();
        self
    }

    /// Builder-style setter for the category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }
}

/// Per-item ownership and trade metadata, keyed by catalog id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InventoryRecord {
    pub have: bool,
    pub need: bool,
    pub count: u32,
    pub value: f64,
    pub currency: String,
    pub for_trade: bool,
    pub notes: String,
}

impl InventoryRecord {
    /// The zero-valued record every item starts with.
    ///
    /// Also the result of reading an id that has no record yet.
    pub fn zeroed() -> Self {
        Self {
            have: false,
            need: false,
            count: 0,
            value: 0.0,
            currency: DEFAULT_CURRENCY.to_string(),
            for_trade: false,
            notes: String::new(),
        }
    }

    /// True when the item is owned and marked for trade.
    pub fn is_tradeable(&self) -> bool {
        self.have && self.for_trade
    }

    /// Value of all owned copies (`value * count`), zero when not owned.
    pub fn owned_value(&self) -> f64 {
        if self.have {
            self.value * f64::from(self.count)
        } else {
            0.0
        }
    }
}

impl Default for InventoryRecord {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// A named, saved selection of items used to build a share summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedShareView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub show_values: bool,
    pub selected_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeroed_record_has_documented_defaults() {
        let record = InventoryRecord::zeroed();
        assert!(!record.have);
        assert!(!record.need);
        assert!(!record.for_trade);
        assert_eq!(record.count, 0);
        assert_eq!(record.value, 0.0);
        assert_eq!(record.currency, "USD");
        assert_eq!(record.notes, "");
        assert_eq!(InventoryRecord::default(), record);
    }

    #[test]
    fn partial_record_deserializes_with_defaults() {
        let record: InventoryRecord = serde_json::from_str(r#"{"count": 4}"#).unwrap();
        assert_eq!(record.count, 4);
        assert_eq!(record.currency, "USD");
        assert!(!record.have);
    }

    #[test]
    fn record_serializes_camel_case() {
        let json = serde_json::to_string(&InventoryRecord::zeroed()).unwrap();
        assert!(json.contains("\"forTrade\":false"));
        assert!(json.contains("\"currency\":\"USD\""));
    }

    #[test]
    fn owned_value_ignores_items_not_owned() {
        let mut record = InventoryRecord::zeroed();
        record.count = 10;
        record.value = 100.0;
        assert_eq!(record.owned_value(), 0.0);

        record.have = true;
        assert_eq!(record.owned_value(), 1000.0);
    }

    #[test]
    fn catalog_item_round_trips_optional_fields() {
        let json = r#"{"id":"a","name":"Spyro","element":"Magic","category":"Figure","game":"Spyro's Adventure","imageUrl":"https://img/spyro.png"}"#;
        let item: CatalogItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.image_url.as_deref(), Some("https://img/spyro.png"));
        assert_eq!(item.link, None);

        let back = serde_json::to_string(&item).unwrap();
        assert!(!back.contains("\"link\""));
    }
}
