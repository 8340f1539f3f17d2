//! Shared types for the Skylander inventory tracker.

pub mod error;
pub mod models;

pub use error::{FetchError, ImportError, PersistenceError};
pub use models::{CatalogItem, InventoryRecord, SavedShareView};
