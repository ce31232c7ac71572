//! OpenAI connector
//!
//! Chat completions (with image inputs), embeddings, speech-to-text,
//! text-to-speech and image generation.

mod types;

pub use types::*;

use crate::connector::{execute_each, Connector, Execution};
use crate::connectors::get_builtin;
use crate::definition::DefinitionSet;
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig, RequestConfig};
use crate::types::{
    data_url, decode_base64, encode_base64, from_config, from_document, sniff_mime, to_document,
    trim_base64_mime, ConnectionState, Document,
};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use std::str::FromStr;
use tracing::debug;
use uuid::Uuid;

const VENDOR: &str = "OpenAI";

/// Model that rejects the `response_format` parameter
const VISION_PREVIEW_MODEL: &str = "gpt-4-vision-preview";

/// Supported tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    TextGeneration,
    TextEmbeddings,
    SpeechRecognition,
    TextToSpeech,
    TextToImage,
}

impl FromStr for Task {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "TASK_TEXT_GENERATION" => Ok(Task::TextGeneration),
            "TASK_TEXT_EMBEDDINGS" => Ok(Task::TextEmbeddings),
            "TASK_SPEECH_RECOGNITION" => Ok(Task::SpeechRecognition),
            "TASK_TEXT_TO_SPEECH" => Ok(Task::TextToSpeech),
            "TASK_TEXT_TO_IMAGE" => Ok(Task::TextToImage),
            other => Err(Error::task_not_supported(other)),
        }
    }
}

/// OpenAI connector
pub struct OpenAiConnector {
    definitions: DefinitionSet,
}

impl OpenAiConnector {
    /// Load the embedded definitions
    pub fn new() -> Result<Self> {
        Ok(Self {
            definitions: DefinitionSet::from_json("openai", get_builtin("openai")?)?,
        })
    }
}

fn client(config: &OpenAiConfig) -> Result<HttpClient> {
    let mut builder = HttpClientConfig::builder()
        .vendor(VENDOR)
        .base_url(config.base_url())
        .bearer_auth(&config.api_key)
        .error_body::<OpenAiError>();

    if let Some(org) = config.organization.as_deref().filter(|o| !o.is_empty()) {
        builder = builder.header("OpenAI-Organization", org);
    }

    HttpClient::with_config(builder.build())
}

#[async_trait]
impl Connector for OpenAiConnector {
    fn vendor(&self) -> &'static str {
        VENDOR
    }

    fn definitions(&self) -> &DefinitionSet {
        &self.definitions
    }

    fn create_execution(
        &self,
        uid: Uuid,
        task: &str,
        config: &Document,
    ) -> Result<Box<dyn Execution>> {
        self.definitions.by_uid(&uid)?;
        Ok(Box::new(OpenAiExecution {
            task: task.parse()?,
            config: from_config(config)?,
        }))
    }

    async fn test(&self, uid: Uuid, config: &Document) -> Result<ConnectionState> {
        self.definitions.by_uid(&uid)?;
        let config: OpenAiConfig = from_config(config)?;
        let models: ListModelsResponse = client(&config)?.get_json("/v1/models").await?;
        if models.data.is_empty() {
            return Ok(ConnectionState::Disconnected);
        }
        Ok(ConnectionState::Connected)
    }
}

struct OpenAiExecution {
    task: Task,
    config: OpenAiConfig,
}

/// Build the chat messages for a completion request
///
/// A chat history replaces the system message. The user turn carries the
/// prompt followed by every image as a data URL.
pub fn build_messages(input: &TextCompletionInput) -> Result<Vec<Message>> {
    let mut messages = Vec::new();

    if let Some(history) = &input.chat_history {
        for m in history {
            messages.push(Message {
                role: m.role.clone(),
                content: vec![Content::Text {
                    text: m.content.clone(),
                }],
            });
        }
    } else if let Some(system) = &input.system_message {
        messages.push(Message {
            role: "system".to_string(),
            content: vec![Content::Text {
                text: system.clone(),
            }],
        });
    }

    let mut user = vec![Content::Text {
        text: input.prompt.clone(),
    }];
    for image in &input.images {
        let bytes = decode_base64(image)?;
        user.push(Content::ImageUrl {
            image_url: ImageUrl {
                url: data_url(sniff_mime(&bytes), trim_base64_mime(image)),
            },
        });
    }
    messages.push(Message {
        role: "user".to_string(),
        content: user,
    });

    Ok(messages)
}

impl OpenAiExecution {
    async fn run_one(&self, client: &HttpClient, input: Document) -> Result<Document> {
        match self.task {
            Task::TextGeneration => {
                let input: TextCompletionInput = from_document(&input)?;
                let response_format = if input.model == VISION_PREVIEW_MODEL {
                    None
                } else {
                    input.response_format.clone()
                };
                let req = TextCompletionRequest {
                    messages: build_messages(&input)?,
                    model: input.model,
                    temperature: input.temperature,
                    top_p: input.top_p,
                    n: input.n,
                    max_tokens: input.max_tokens,
                    presence_penalty: input.presence_penalty,
                    frequency_penalty: input.frequency_penalty,
                    response_format,
                };
                let resp: TextCompletionResponse =
                    client.post_json("/v1/chat/completions", &req).await?;
                to_document(&TextCompletionOutput {
                    texts: resp.choices.into_iter().map(|c| c.message.content).collect(),
                })
            }
            Task::TextEmbeddings => {
                let input: TextEmbeddingsInput = from_document(&input)?;
                let req = TextEmbeddingsRequest {
                    model: input.model,
                    input: vec![input.text],
                };
                let resp: TextEmbeddingsResponse = client.post_json("/v1/embeddings", &req).await?;
                let embedding = resp
                    .data
                    .into_iter()
                    .next()
                    .map(|d| d.embedding)
                    .ok_or_else(|| Error::decode(VENDOR, "embeddings response has no data"))?;
                to_document(&TextEmbeddingsOutput { embedding })
            }
            Task::SpeechRecognition => {
                let input: AudioTranscriptionInput = from_document(&input)?;
                let audio = decode_base64(&input.audio)?;
                let mime = sniff_mime(&audio);
                let file = Part::bytes(audio)
                    .file_name("audio")
                    .mime_str(mime)
                    .map_err(|e| Error::input(format!("invalid audio payload: {e}")))?;

                let mut form = Form::new().part("file", file).text("model", input.model);
                if let Some(prompt) = input.prompt {
                    form = form.text("prompt", prompt);
                }
                if let Some(language) = input.language {
                    form = form.text("language", language);
                }
                if let Some(temperature) = input.temperature {
                    form = form.text("temperature", format!("{temperature:.6}"));
                }

                let resp: AudioTranscriptionOutput = client
                    .request_json(
                        Method::POST,
                        "/v1/audio/transcriptions",
                        RequestConfig::new().multipart(form),
                    )
                    .await?;
                to_document(&resp)
            }
            Task::TextToSpeech => {
                let input: TextToSpeechInput = from_document(&input)?;
                let req = TextToSpeechRequest {
                    input: input.text,
                    model: input.model,
                    voice: input.voice,
                    response_format: input.response_format,
                    speed: input.speed,
                };
                let resp = client
                    .request(
                        Method::POST,
                        "/v1/audio/speech",
                        RequestConfig::new().json(serde_json::to_value(&req)?),
                    )
                    .await?;
                debug!(bytes = resp.body.len(), "Received synthesized speech");
                to_document(&TextToSpeechOutput {
                    audio: data_url("audio/wav", &encode_base64(&resp.body)),
                })
            }
            Task::TextToImage => {
                let input: ImageGenerationInput = from_document(&input)?;
                let req = ImageGenerationRequest {
                    prompt: input.prompt,
                    model: input.model,
                    n: input.n,
                    quality: input.quality,
                    size: input.size,
                    style: input.style,
                    response_format: "b64_json".to_string(),
                };
                let resp: ImageGenerationResponse =
                    client.post_json("/v1/images/generations", &req).await?;
                let results = resp
                    .data
                    .into_iter()
                    .map(|d| ImageGenerationResult {
                        image: data_url("image/webp", &d.image),
                        revised_prompt: d.revised_prompt,
                    })
                    .collect();
                to_document(&ImageGenerationOutput { results })
            }
        }
    }
}

#[async_trait]
impl Execution for OpenAiExecution {
    async fn execute(&self, inputs: Vec<Document>) -> Result<Vec<Document>> {
        let client = client(&self.config)?;
        execute_each(inputs, |input| self.run_one(&client, input)).await
    }
}
