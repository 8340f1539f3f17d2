//! Record normalizer: turns loosely-typed tabular rows into catalog items.
//!
//! Rows come from a CSV upload or a fetched spreadsheet export. A header row
//! is required; recognized columns are `id, name, element, category, game,
//! imageUrl|image, link`. Anything else is ignored.

use skylander_common::models::{
    DEFAULT_CATEGORY, DEFAULT_ELEMENT, DEFAULT_GAME, SYNTHETIC_ID_PREFIX,
};
use skylander_common::{CatalogItem, ImportError};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// One input row, column header -> cell text.
pub type RawRow = HashMap<String, String>;

/// Parse CSV text with a header row into raw rows.
///
/// Cells are trimmed and ragged rows are tolerated; missing trailing cells
/// simply don't appear in the row.
pub fn parse_csv<R: Read>(reader: R) -> Result<Vec<RawRow>, ImportError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let mut rows = Vec::new();

    for result in rdr.records() {
        let record = result?;
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(header, cell)| (header.to_string(), cell.to_string()))
            .collect();
        rows.push(row);
    }

    log::debug!("Parsed {} CSV rows ({} columns)", rows.len(), headers.len());
    Ok(rows)
}

/// Parse CSV held in memory (fetched sheet export or request body).
pub fn parse_csv_str(text: &str) -> Result<Vec<RawRow>, ImportError> {
    parse_csv(text.as_bytes())
}

/// Read and parse a CSV file from disk.
pub fn read_csv_file<P: AsRef<Path>>(path: P) -> Result<Vec<RawRow>, ImportError> {
    let file = std::fs::File::open(path.as_ref())?;
    parse_csv(file)
}

/// Parse and normalize CSV text in one step.
pub fn import_csv_text(text: &str) -> Result<Vec<CatalogItem>, ImportError> {
    normalize(&parse_csv_str(text)?)
}

/// Returns the trimmed cell for `key`, treating blank cells as missing.
fn field<'a>(row: &'a RawRow, key: &str) -> Option<&'a str> {
    row.get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

/// Convert raw rows into catalog items.
///
/// Rows with a missing or blank `name` are dropped. A row without an `id`
/// gets `skylander-<index>`, where index is the row's position in `rows`
/// before any filtering, so ids stay tied to the source row.
///
/// Fails with [`ImportError::NoValidRows`] when nothing survives filtering.
pub fn normalize(rows: &[RawRow]) -> Result<Vec<CatalogItem>, ImportError> {
    let mut items = Vec::with_capacity(rows.len());
    let mut dropped = 0usize;

    for (index, row) in rows.iter().enumerate() {
        let Some(name) = field(row, "name") else {
            dropped += 1;
            continue;
        };

        let id = field(row, "id")
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}{}", SYNTHETIC_ID_PREFIX, index));

        items.push(CatalogItem {
            id,
            name: name.to_string(),
            element: field(row, "element").unwrap_or(DEFAULT_ELEMENT).to_string(),
            category: field(row, "category")
                .unwrap_or(DEFAULT_CATEGORY)
                .to_string(),
            game: field(row, "game").unwrap_or(DEFAULT_GAME).to_string(),
            image_url: field(row, "imageUrl")
                .or_else(|| field(row, "image"))
                .map(str::to_string),
            link: field(row, "link").map(str::to_string),
        });
    }

    if dropped > 0 {
        log::warn!("Skipped {} rows without a name", dropped);
    }

    if items.is_empty() {
        return Err(ImportError::NoValidRows);
    }

    Ok(items)
}
