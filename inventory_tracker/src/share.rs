//! Share summaries: drafts, payloads and self-contained share links.
//!
//! A share link embeds the whole payload as base64 JSON in the URL path, so
//! the receiving side needs nothing but the link to rebuild the view.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use skylander_common::SavedShareView;

pub const DEFAULT_SHARE_TITLE: &str = "My Skylanders Collection";
pub const DEFAULT_SHARE_DESCRIPTION: &str = "Check out my Skylanders collection!";
/// Host share links point at unless configured otherwise
pub const DEFAULT_SHARE_BASE_URL: &str = "https://skylander-inventory.example.com";

/// The share screen's editable state: text, value visibility and selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShareDraft {
    pub title: String,
    pub description: String,
    pub show_values: bool,
    pub selected_ids: Vec<String>,
}

impl Default for ShareDraft {
    fn default() -> Self {
        Self {
            title: DEFAULT_SHARE_TITLE.to_string(),
            description: DEFAULT_SHARE_DESCRIPTION.to_string(),
            show_values: false,
            selected_ids: Vec::new(),
        }
    }
}

impl ShareDraft {
    /// Selected ids in selection order with repeats removed
    pub fn unique_ids(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.selected_ids
            .iter()
            .map(String::as_str)
            .filter(|id| seen.insert(*id))
            .collect()
    }
}

impl From<&SavedShareView> for ShareDraft {
    fn from(view: &SavedShareView) -> Self {
        Self {
            title: view.title.clone(),
            description: view.description.clone(),
            show_values: view.show_values,
            selected_ids: view.selected_ids.clone(),
        }
    }
}

/// One shared item. `value` is null whenever values are hidden.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareItem {
    pub id: String,
    pub name: String,
    pub element: String,
    pub category: String,
    pub image_url: Option<String>,
    pub count: u32,
    pub value: Option<f64>,
}

/// Serializable summary embedded in a share link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharePayload {
    pub title: String,
    pub description: String,
    pub show_values: bool,
    #[serde(rename = "skylanders")]
    pub items: Vec<ShareItem>,
}

/// Encode a payload as `<base_url>/shared/<base64 JSON>`.
pub fn share_link(payload: &SharePayload, base_url: &str) -> Result<String, serde_json::Error> {
    let json = serde_json::to_vec(payload)?;
    let encoded = STANDARD.encode(json);
    Ok(format!("{}/shared/{}", base_url.trim_end_matches('/'), encoded))
}
