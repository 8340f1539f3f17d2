//! Error taxonomy shared by every front-end of the tracker.
//!
//! None of these are fatal: each is recovered where it occurs and shown to
//! the user as a dismissible notice. There is no retry policy.

use thiserror::Error;

/// Malformed or empty import input. User-correctable.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Error parsing CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to read import file: {0}")]
    Io(#[from] std::io::Error),

    #[error("No valid Skylander data found in the imported file.")]
    NoValidRows,
}

/// Network or URL problems while importing a published spreadsheet.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid Google Sheets URL. Please provide a valid sharing link.")]
    InvalidUrl(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Failed to fetch Google Sheet (HTTP {0}). Make sure it is publicly accessible.")]
    HttpStatus(reqwest::StatusCode),
}

/// Failure to read or write durable local state.
///
/// A write failure never rolls back the in-memory mutation that caused it.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Stored value for '{key}' is corrupt: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Storage quota exceeded writing '{key}' ({needed} bytes, quota {quota})")]
    QuotaExceeded {
        key: String,
        needed: usize,
        quota: usize,
    },

    #[error("Stored schema version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("Storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_valid_rows_message_is_user_facing() {
        assert_eq!(
            ImportError::NoValidRows.to_string(),
            "No valid Skylander data found in the imported file."
        );
    }

    #[test]
    fn quota_message_names_key() {
        let err = PersistenceError::QuotaExceeded {
            key: "userInventory".to_string(),
            needed: 20,
            quota: 10,
        };
        assert!(err.to_string().contains("userInventory"));
    }
}
