//! Published spreadsheet import
//!
//! Accepts a sharing URL containing `spreadsheets/d/<id>`, resolves it to the
//! CSV export endpoint and fetches the export text.

use regex::Regex;
use skylander_common::FetchError;
use std::sync::OnceLock;

/// Host serving the CSV export for a published sheet
pub const SHEETS_BASE_URL: &str = "https://docs.google.com";

fn sheet_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"spreadsheets/d/([a-zA-Z0-9_-]+)").expect("sheet id pattern is valid")
    })
}

/// A spreadsheet reference extracted from a sharing URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetUrl {
    sheet_id: String,
    base_url: String,
}

impl SheetUrl {
    /// Extract the sheet id from a sharing URL.
    pub fn parse(url: &str) -> Result<Self, FetchError> {
        let captures = sheet_id_pattern()
            .captures(url.trim())
            .ok_or_else(|| FetchError::InvalidUrl(url.to_string()))?;

        Ok(Self {
            sheet_id: captures[1].to_string(),
            base_url: SHEETS_BASE_URL.to_string(),
        })
    }

    /// Point the export at a different host (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn sheet_id(&self) -> &str {
        &self.sheet_id
    }

    /// The CSV export endpoint for this sheet
    pub fn export_url(&self) -> String {
        format!(
            "{}/spreadsheets/d/{}/export?format=csv",
            self.base_url, self.sheet_id
        )
    }
}

/// Fetch the CSV export text for a sheet (async)
pub async fn fetch_sheet_csv(
    client: &reqwest::Client,
    sheet: &SheetUrl,
) -> Result<String, FetchError> {
    let url = sheet.export_url();
    log::info!("Fetching sheet export: {}", url);

    let response = client
        .get(&url)
        .header("User-Agent", "inventory_tracker/1.0")
        .send()
        .await?;

    if !response.status().is_success() {
        log::warn!("Sheet export returned HTTP {}", response.status());
        return Err(FetchError::HttpStatus(response.status()));
    }

    let text = response.text().await?;
    log::info!("Fetched {} bytes of CSV from sheet {}", text.len(), sheet.sheet_id());
    Ok(text)
}

#[cfg(test)]
#[path = "sheets_tests.rs"]
mod tests;
