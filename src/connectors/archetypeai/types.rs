//! Archetype AI request and response shapes

use crate::http::ErrorBody;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_PATH: &str = "https://api.archetypeai.dev";

pub const STATUS_COMPLETED: &str = "completed";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArchetypeAiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub base_path: Option<String>,
}

impl ArchetypeAiConfig {
    pub fn base_path(&self) -> &str {
        match self.base_path.as_deref() {
            Some(url) if !url.is_empty() => url,
            _ => DEFAULT_BASE_PATH,
        }
    }
}

/// Task input, sent to the API as is
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizeParams {
    pub query: String,
    #[serde(default)]
    pub file_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcessedText {
    #[serde(default)]
    pub processed_text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummarizeResponse {
    #[serde(default)]
    pub query_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub response: ProcessedText,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummarizeOutput {
    pub response: String,
}

#[derive(Debug, Deserialize)]
pub struct ArchetypeAiError {
    #[serde(default)]
    error: String,
}

impl ErrorBody for ArchetypeAiError {
    fn message(&self) -> Option<String> {
        (!self.error.is_empty()).then(|| self.error.clone())
    }
}
