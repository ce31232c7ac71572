//! OpenAI request and response shapes

use crate::http::ErrorBody;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Resource configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub organization: Option<String>,
    /// Overrides the public API host
    #[serde(default)]
    pub base_url: Option<String>,
}

impl OpenAiConfig {
    pub fn base_url(&self) -> &str {
        match self.base_url.as_deref() {
            Some(url) if !url.is_empty() => url,
            _ => DEFAULT_BASE_URL,
        }
    }
}

// ============================================================================
// Text generation
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ChatHistoryMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextCompletionInput {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub model: String,
    #[serde(default)]
    pub system_message: Option<String>,
    #[serde(default)]
    pub chat_history: Option<Vec<ChatHistoryMessage>>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub top_p: Option<f32>,
    #[serde(default)]
    pub n: Option<u32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub presence_penalty: Option<f32>,
    #[serde(default)]
    pub frequency_penalty: Option<f32>,
    #[serde(default)]
    pub response_format: Option<ResponseFormat>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Content {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub role: String,
    pub content: Vec<Content>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextCompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputMessage {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: OutputMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextCompletionOutput {
    pub texts: Vec<String>,
}

// ============================================================================
// Embeddings
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct TextEmbeddingsInput {
    pub model: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextEmbeddingsRequest {
    pub model: String,
    pub input: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingData {
    pub embedding: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextEmbeddingsResponse {
    #[serde(default)]
    pub data: Vec<EmbeddingData>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextEmbeddingsOutput {
    pub embedding: Vec<f64>,
}

// ============================================================================
// Speech
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct AudioTranscriptionInput {
    pub audio: String,
    pub model: String,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioTranscriptionOutput {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextToSpeechInput {
    pub text: String,
    pub model: String,
    pub voice: String,
    #[serde(default)]
    pub response_format: Option<String>,
    #[serde(default)]
    pub speed: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextToSpeechRequest {
    pub input: String,
    pub model: String,
    pub voice: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextToSpeechOutput {
    pub audio: String,
}

// ============================================================================
// Images
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ImageGenerationInput {
    pub prompt: String,
    pub model: String,
    #[serde(default)]
    pub n: Option<u32>,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageGenerationRequest {
    pub prompt: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    pub response_format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageData {
    #[serde(rename = "b64_json", default)]
    pub image: String,
    #[serde(default)]
    pub revised_prompt: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageGenerationResponse {
    #[serde(default)]
    pub data: Vec<ImageData>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageGenerationResult {
    pub image: String,
    pub revised_prompt: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageGenerationOutput {
    pub results: Vec<ImageGenerationResult>,
}

// ============================================================================
// Models
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct Model {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListModelsResponse {
    #[serde(default)]
    pub data: Vec<Model>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
pub struct OpenAiError {
    error: ErrorDetail,
}

impl ErrorBody for OpenAiError {
    fn message(&self) -> Option<String> {
        Some(self.error.message.clone())
    }
}
