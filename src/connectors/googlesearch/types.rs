//! Google Custom Search shapes

use crate::http::ErrorBody;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/customsearch/v1";

/// Results per Custom Search page
pub const MAX_RESULTS_PER_PAGE: usize = 10;

/// Custom Search never returns more than this many results
pub const MAX_RESULTS: usize = 100;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoogleSearchConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub cse_id: String,
    #[serde(default)]
    pub base_url: Option<String>,
}

impl GoogleSearchConfig {
    pub fn base_url(&self) -> &str {
        match self.base_url.as_deref() {
            Some(url) if !url.is_empty() => url,
            _ => DEFAULT_BASE_URL,
        }
    }
}

fn default_top_k() -> i64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchInput {
    pub query: String,
    #[serde(default = "default_top_k")]
    pub top_k: i64,
    #[serde(default)]
    pub include_link_text: bool,
    #[serde(default)]
    pub include_link_html: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub snippet: String,
}

/// One page of Custom Search results
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
    pub link_text: String,
    pub link_html: String,
}

#[derive(Debug, Serialize)]
pub struct SearchOutput {
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
pub struct GoogleSearchError {
    error: ErrorDetail,
}

impl ErrorBody for GoogleSearchError {
    fn message(&self) -> Option<String> {
        Some(self.error.message.clone())
    }
}
