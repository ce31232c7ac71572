//! Stability AI request and response shapes

use crate::http::ErrorBody;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api.stability.ai";

/// Artifacts with any other finish reason are dropped
pub const SUCCESS_FINISH_REASON: &str = "SUCCESS";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StabilityAiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub base_url: Option<String>,
}

impl StabilityAiConfig {
    pub fn base_url(&self) -> &str {
        match self.base_url.as_deref() {
            Some(url) if !url.is_empty() => url,
            _ => DEFAULT_BASE_URL,
        }
    }
}

/// Generation parameters shared by both tasks
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tuning {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cfg_scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip_guidance_preset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampler: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub samples: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_preset: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextToImageInput {
    #[serde(default)]
    pub prompts: Vec<String>,
    #[serde(default)]
    pub engine: String,
    #[serde(default)]
    pub weights: Option<Vec<f64>>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(flatten)]
    pub tuning: Tuning,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageToImageInput {
    #[serde(default)]
    pub prompts: Vec<String>,
    #[serde(default)]
    pub engine: String,
    pub init_image: String,
    #[serde(default)]
    pub weights: Option<Vec<f64>>,
    #[serde(default)]
    pub init_image_mode: Option<String>,
    #[serde(default)]
    pub image_strength: Option<f64>,
    #[serde(default)]
    pub step_schedule_start: Option<f64>,
    #[serde(default)]
    pub step_schedule_end: Option<f64>,
    #[serde(flatten)]
    pub tuning: Tuning,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextPrompt {
    pub text: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextToImageRequest {
    pub text_prompts: Vec<TextPrompt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(flatten)]
    pub tuning: Tuning,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Artifact {
    #[serde(default)]
    pub base64: String,
    #[serde(default)]
    pub seed: u32,
    #[serde(rename = "finishReason", default)]
    pub finish_reason: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageTaskResponse {
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImageOutput {
    pub images: Vec<String>,
    pub seeds: Vec<u32>,
}

impl From<ImageTaskResponse> for ImageOutput {
    fn from(resp: ImageTaskResponse) -> Self {
        let mut out = ImageOutput::default();
        for artifact in resp
            .artifacts
            .into_iter()
            .filter(|a| a.finish_reason == SUCCESS_FINISH_REASON)
        {
            out.images.push(artifact.base64);
            out.seeds.push(artifact.seed);
        }
        out
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Engine {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct StabilityAiError {
    #[serde(default)]
    message: String,
}

impl ErrorBody for StabilityAiError {
    fn message(&self) -> Option<String> {
        (!self.message.is_empty()).then(|| self.message.clone())
    }
}
