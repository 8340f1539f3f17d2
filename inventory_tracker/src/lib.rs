//! Skylander Inventory Tracker
//!
//! Imports a Skylander catalog from CSV or a published spreadsheet, tracks
//! per-figure ownership, wants, trades and value, and derives dashboards,
//! filtered lists, trade lists and share links from that state.

pub mod config;
pub mod error;
pub mod normalizer;
pub mod persistence;
pub mod share;
pub mod sheets;
pub mod storage;
pub mod store;
pub mod views;
pub mod web;

pub use error::{Result, TrackerError};
pub use normalizer::{import_csv_text, normalize, parse_csv, read_csv_file, RawRow};
pub use persistence::{InventoryMap, PersistenceGateway};
pub use share::{share_link, ShareDraft, SharePayload};
pub use sheets::{fetch_sheet_csv, SheetUrl};
pub use storage::{MemoryStorage, SqliteStorage, StateStorage};
pub use store::{CatalogField, FieldUpdate, ImportSummary, InventoryStore, ItemQuery};
pub use views::{DashboardStats, InventoryView, ListFilter, TradeFilter};
