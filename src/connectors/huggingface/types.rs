//! Hugging Face Inference API response shapes

use crate::http::ErrorBody;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co";

/// Resource configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HuggingFaceConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub base_url: Option<String>,
    /// When set, `base_url` already points at a single deployed model
    #[serde(default)]
    pub is_custom_endpoint: bool,
}

impl HuggingFaceConfig {
    pub fn base_url(&self) -> &str {
        match self.base_url.as_deref() {
            Some(url) if !url.is_empty() => url,
            _ => DEFAULT_BASE_URL,
        }
    }

    /// URL to call for `model`
    pub fn model_url(&self, model: &str) -> String {
        let base = self.base_url().trim_end_matches('/');
        if self.is_custom_endpoint {
            base.to_string()
        } else {
            format!("{base}/models/{model}")
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GeneratedText {
    #[serde(default)]
    pub generated_text: String,
}

#[derive(Debug, Deserialize)]
pub struct SummaryText {
    #[serde(default)]
    pub summary_text: String,
}

#[derive(Debug, Deserialize)]
pub struct TranslationText {
    #[serde(default)]
    pub translation_text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FillMaskResult {
    pub sequence: String,
    pub score: f64,
    pub token: i64,
    pub token_str: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenEntity {
    #[serde(default)]
    pub entity_group: String,
    pub score: f64,
    pub word: String,
    #[serde(default)]
    pub start: Option<i64>,
    #[serde(default)]
    pub end: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Segment {
    pub label: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub mask: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BoundingBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DetectedObject {
    pub label: String,
    pub score: f64,
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
}

/// Error payload: a single message or a list of them
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorField {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize)]
pub struct HuggingFaceError {
    error: ErrorField,
}

impl ErrorBody for HuggingFaceError {
    fn message(&self) -> Option<String> {
        match &self.error {
            ErrorField::One(msg) => Some(msg.clone()),
            ErrorField::Many(msgs) => Some(msgs.join(" ")),
        }
    }
}
