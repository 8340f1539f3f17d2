//! Derived views over the catalog and inventory.
//!
//! Everything here is a pure projection recomputed on demand: dashboard
//! stats, the filter/sort pipeline, the trade list and share payloads.
//! Ids without an inventory record read as the zero-valued record.

use crate::persistence::InventoryMap;
use crate::share::{ShareDraft, ShareItem, SharePayload};
use serde::{Deserialize, Serialize};
use skylander_common::models::DEFAULT_NAME;
use skylander_common::{CatalogItem, InventoryRecord};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::str::FromStr;

/// First line of the trade list text
pub const TRADE_LIST_HEADER: &str = "Skylanders Available for Trade:";
/// Rendered in place of item lines when nothing is up for trade
pub const NO_TRADE_ITEMS: &str = "No Skylanders currently available for trade.";
/// Last line of a non-empty trade list
pub const TRADE_LIST_TRAILER: &str = "Contact me to discuss trades!";

/// Get-or-default accessor: the stored record for `id`, or the zeroed one.
pub fn record_or_default<'a>(inventory: &'a InventoryMap, id: &str) -> Cow<'a, InventoryRecord> {
    match inventory.get(id) {
        Some(record) => Cow::Borrowed(record),
        None => Cow::Owned(InventoryRecord::zeroed()),
    }
}

/// Name used when an item is displayed without a name.
///
/// Normalized items always carry a name; this only covers catalog entries
/// written by hand into the stored state.
pub fn display_name(item: &CatalogItem) -> &str {
    if item.name.trim().is_empty() {
        DEFAULT_NAME
    } else {
        &item.name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Have,
    Need,
    Trade,
}

impl StatusFilter {
    fn matches(self, record: &InventoryRecord) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Have => record.have,
            StatusFilter::Need => record.need,
            StatusFilter::Trade => record.for_trade,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "have" => Ok(StatusFilter::Have),
            "need" => Ok(StatusFilter::Need),
            "trade" | "fortrade" => Ok(StatusFilter::Trade),
            other => Err(format!("unknown status filter '{}' (all, have, need, trade)", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Name,
    Element,
    Value,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "name" => Ok(SortKey::Name),
            "element" => Ok(SortKey::Element),
            "value" => Ok(SortKey::Value),
            other => Err(format!("unknown sort key '{}' (name, element, value)", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(format!("unknown sort direction '{}' (asc, desc)", other)),
        }
    }
}

/// Dashboard filter controls
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListFilter {
    pub status: StatusFilter,
    /// `None`, blank or `"all"` disables the element filter
    pub element: Option<String>,
    pub search: String,
    pub sort: SortKey,
    pub direction: SortDirection,
}

/// Trade screen filter controls
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradeFilter {
    pub element: Option<String>,
    pub search: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total: usize,
    pub have: usize,
    pub need: usize,
    pub for_trade: usize,
    pub total_value: f64,
}

/// A catalog item with its inventory record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDetail {
    pub item: CatalogItem,
    pub record: InventoryRecord,
    /// `value * count`, regardless of `have`
    pub total_value: f64,
}

fn active_element(element: &Option<String>) -> Option<&str> {
    element
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty() && !e.eq_ignore_ascii_case("all"))
}

fn matches_search(item: &CatalogItem, query: &str) -> bool {
    item.name.to_lowercase().contains(query)
        || item.element.to_lowercase().contains(query)
        || item.category.to_lowercase().contains(query)
}

fn cmp_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// Read-only projection over a catalog and its inventory map
#[derive(Clone, Copy)]
pub struct InventoryView<'a> {
    catalog: &'a [CatalogItem],
    inventory: &'a InventoryMap,
}

impl<'a> InventoryView<'a> {
    pub fn new(catalog: &'a [CatalogItem], inventory: &'a InventoryMap) -> Self {
        Self { catalog, inventory }
    }

    pub fn record(&self, id: &str) -> Cow<'a, InventoryRecord> {
        record_or_default(self.inventory, id)
    }

    pub fn stats(&self) -> DashboardStats {
        let mut stats = DashboardStats {
            total: self.catalog.len(),
            ..DashboardStats::default()
        };

        for item in self.catalog {
            let record = self.record(&item.id);
            stats.have += usize::from(record.have);
            stats.need += usize::from(record.need);
            stats.for_trade += usize::from(record.for_trade);
            stats.total_value += record.owned_value();
        }

        stats
    }

    /// Distinct element names, sorted
    pub fn elements(&self) -> Vec<&'a str> {
        let mut elements: Vec<&str> = self.catalog.iter().map(|i| i.element.as_str()).collect();
        elements.sort_unstable();
        elements.dedup();
        elements
    }

    /// Apply status, element and search filters, then stable-sort.
    pub fn filter(&self, filter: &ListFilter) -> Vec<&'a CatalogItem> {
        let element = active_element(&filter.element);
        let query = filter.search.trim().to_lowercase();

        let mut items: Vec<&CatalogItem> = self
            .catalog
            .iter()
            .filter(|item| filter.status.matches(&self.record(&item.id)))
            .filter(|item| element.map_or(true, |e| item.element == e))
            .filter(|item| query.is_empty() || matches_search(item, &query))
            .collect();

        items.sort_by(|a, b| {
            let ordering = match filter.sort {
                SortKey::Name => cmp_text(&a.name, &b.name),
                SortKey::Element => cmp_text(&a.element, &b.element),
                SortKey::Value => self
                    .record(&a.id)
                    .value
                    .total_cmp(&self.record(&b.id).value),
            };
            match filter.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });

        items
    }

    /// Owned items marked for trade that match the filter, by name
    pub fn trade_items(&self, filter: &TradeFilter) -> Vec<&'a CatalogItem> {
        self.filter(&ListFilter {
            status: StatusFilter::Trade,
            element: filter.element.clone(),
            search: filter.search.clone(),
            sort: SortKey::Name,
            direction: SortDirection::Asc,
        })
        .into_iter()
        .filter(|item| self.record(&item.id).is_tradeable())
        .collect()
    }

    /// Sum of `count * value` over the tradeable items
    pub fn trade_total_value(&self, filter: &TradeFilter) -> f64 {
        self.trade_items(filter)
            .iter()
            .map(|item| {
                let record = self.record(&item.id);
                f64::from(record.count) * record.value
            })
            .sum()
    }

    /// Plain-text trade list ready to paste into a message.
    pub fn trade_list_text(&self, filter: &TradeFilter) -> String {
        let items = self.trade_items(filter);
        let mut text = format!("{}\n\n", TRADE_LIST_HEADER);

        for item in &items {
            let record = self.record(&item.id);
            // A tradeable item with no count recorded still has one copy
            let count = record.count.max(1);

            text.push_str(&format!(
                "{} ({}) - {} available",
                display_name(item),
                item.element,
                count
            ));
            if record.value > 0.0 {
                text.push_str(&format!(" - Value: {:.2} each", record.value));
            }
            text.push('\n');
        }

        if items.is_empty() {
            text.push_str(NO_TRADE_ITEMS);
        } else {
            text.push('\n');
            text.push_str(TRADE_LIST_TRAILER);
        }

        text
    }

    /// Ids of every owned item, in catalog order
    pub fn owned_ids(&self) -> Vec<String> {
        self.catalog
            .iter()
            .filter(|item| self.record(&item.id).have)
            .map(|item| item.id.clone())
            .collect()
    }

    pub fn item_detail(&self, id: &str) -> Option<ItemDetail> {
        let item = self.catalog.iter().find(|item| item.id == id)?;
        let record = self.record(id).into_owned();
        let total_value = record.value * f64::from(record.count);
        Some(ItemDetail {
            item: item.clone(),
            record,
            total_value,
        })
    }

    /// Build the share payload for the draft's selection.
    ///
    /// Unknown ids are skipped. Values are nulled unless `show_values`.
    pub fn share_payload(&self, draft: &ShareDraft) -> SharePayload {
        let items = draft
            .unique_ids()
            .into_iter()
            .filter_map(|id| self.catalog.iter().find(|item| item.id == id))
            .map(|item| {
                let record = self.record(&item.id);
                ShareItem {
                    id: item.id.clone(),
                    name: display_name(item).to_string(),
                    element: item.element.clone(),
                    category: item.category.clone(),
                    image_url: item.image_url.clone(),
                    count: record.count,
                    value: draft.show_values.then_some(record.value),
                }
            })
            .collect();

        SharePayload {
            title: draft.title.clone(),
            description: draft.description.clone(),
            show_values: draft.show_values,
            items,
        }
    }
}
