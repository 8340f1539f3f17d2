//! Error types for inventory_tracker

use skylander_common::{FetchError, ImportError, PersistenceError};
use std::fmt;

/// Unified error type for inventory_tracker operations
#[derive(Debug)]
pub enum TrackerError {
    /// CSV input was malformed or held no usable rows
    Import(ImportError),
    /// Spreadsheet URL was invalid or could not be fetched
    Fetch(FetchError),
    /// Durable state could not be read or written.
    ///
    /// Returned by a store mutation, this means the change is applied in
    /// memory but was not saved.
    Persistence(PersistenceError),
    /// Field name is not one of the updatable inventory fields
    UnknownField(String),
    /// Field value could not be coerced or is out of range
    InvalidValue { field: String, value: String },
    /// No saved share view with this id
    UnknownShareView(String),
}

impl TrackerError {
    /// True when only the save failed and the in-memory mutation stands.
    pub fn is_persistence(&self) -> bool {
        matches!(self, TrackerError::Persistence(_))
    }

    pub(crate) fn invalid_value(field: &str, value: impl ToString) -> Self {
        TrackerError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerError::Import(e) => write!(f, "{}", e),
            TrackerError::Fetch(e) => write!(f, "{}", e),
            TrackerError::Persistence(e) => write!(f, "Failed to save inventory: {}", e),
            TrackerError::UnknownField(field) => write!(f, "Unknown inventory field: {}", field),
            TrackerError::InvalidValue { field, value } => {
                write!(f, "Invalid value for {}: {}", field, value)
            }
            TrackerError::UnknownShareView(id) => write!(f, "No saved share view: {}", id),
        }
    }
}

impl std::error::Error for TrackerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TrackerError::Import(e) => Some(e),
            TrackerError::Fetch(e) => Some(e),
            TrackerError::Persistence(e) => Some(e),
            TrackerError::UnknownField(_) => None,
            TrackerError::InvalidValue { .. } => None,
            TrackerError::UnknownShareView(_) => None,
        }
    }
}

impl From<ImportError> for TrackerError {
    fn from(err: ImportError) -> Self {
        TrackerError::Import(err)
    }
}

impl From<FetchError> for TrackerError {
    fn from(err: FetchError) -> Self {
        TrackerError::Fetch(err)
    }
}

impl From<PersistenceError> for TrackerError {
    fn from(err: PersistenceError) -> Self {
        TrackerError::Persistence(err)
    }
}

/// Result alias for inventory_tracker operations
pub type Result<T> = std::result::Result<T, TrackerError>;
