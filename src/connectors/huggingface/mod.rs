//! Hugging Face Inference API connector
//!
//! Every task is the same call: POST the input to the model endpoint and
//! reshape the answer. Tasks only differ in how the request body is built
//! (JSON or raw media bytes) and in how the response is mapped.

mod types;

pub use types::*;

use crate::connector::{execute_each, Connector, Execution};
use crate::connectors::get_builtin;
use crate::definition::DefinitionSet;
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig, RequestConfig};
use crate::types::{
    decode_base64, encode_base64, from_config, sniff_mime, ConnectionState, Document, JsonValue,
};
use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::str::FromStr;
use uuid::Uuid;

const VENDOR: &str = "Hugging Face";

/// Supported tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    TextGeneration,
    TextToImage,
    FillMask,
    Summarization,
    TextClassification,
    TokenClassification,
    Translation,
    ZeroShotClassification,
    QuestionAnswering,
    TableQuestionAnswering,
    SentenceSimilarity,
    Conversational,
    ImageClassification,
    ImageSegmentation,
    ObjectDetection,
    ImageToText,
    SpeechRecognition,
    AudioClassification,
}

impl FromStr for Task {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "TASK_TEXT_GENERATION" => Task::TextGeneration,
            "TASK_TEXT_TO_IMAGE" => Task::TextToImage,
            "TASK_FILL_MASK" => Task::FillMask,
            "TASK_SUMMARIZATION" => Task::Summarization,
            "TASK_TEXT_CLASSIFICATION" => Task::TextClassification,
            "TASK_TOKEN_CLASSIFICATION" => Task::TokenClassification,
            "TASK_TRANSLATION" => Task::Translation,
            "TASK_ZERO_SHOT_CLASSIFICATION" => Task::ZeroShotClassification,
            "TASK_QUESTION_ANSWERING" => Task::QuestionAnswering,
            "TASK_TABLE_QUESTION_ANSWERING" => Task::TableQuestionAnswering,
            "TASK_SENTENCE_SIMILARITY" => Task::SentenceSimilarity,
            "TASK_CONVERSATIONAL" => Task::Conversational,
            "TASK_IMAGE_CLASSIFICATION" => Task::ImageClassification,
            "TASK_IMAGE_SEGMENTATION" => Task::ImageSegmentation,
            "TASK_OBJECT_DETECTION" => Task::ObjectDetection,
            "TASK_IMAGE_TO_TEXT" => Task::ImageToText,
            "TASK_SPEECH_RECOGNITION" => Task::SpeechRecognition,
            "TASK_AUDIO_CLASSIFICATION" => Task::AudioClassification,
            other => return Err(Error::task_not_supported(other)),
        })
    }
}

/// How a task's request body is built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// `{inputs, parameters, options}` as JSON
    Json,
    /// Raw bytes of the base64 `image` field
    Image,
    /// Raw bytes of the base64 `audio` field
    Audio,
}

impl Task {
    pub fn request_kind(self) -> RequestKind {
        match self {
            Task::ImageClassification
            | Task::ImageSegmentation
            | Task::ObjectDetection
            | Task::ImageToText => RequestKind::Image,
            Task::SpeechRecognition | Task::AudioClassification => RequestKind::Audio,
            _ => RequestKind::Json,
        }
    }

    /// Reshape a successful response body into the task output
    pub fn map_response(self, body: &[u8]) -> Result<Document> {
        match self {
            Task::TextGeneration => {
                let r: GeneratedText = first(decode(body)?)?;
                single("generated_text", r.generated_text)
            }
            Task::TextToImage => single("image", encode_base64(body)),
            Task::FillMask => single("results", decode::<Vec<FillMaskResult>>(body)?),
            Task::Summarization => {
                let r: SummaryText = first(decode(body)?)?;
                single("summary_text", r.summary_text)
            }
            Task::TextClassification => {
                let rows: Vec<LabelScore> = first(decode(body)?)?;
                single("results", rows)
            }
            Task::TokenClassification => single("results", decode::<Vec<TokenEntity>>(body)?),
            Task::Translation => {
                let r: TranslationText = first(decode(body)?)?;
                single("translation_text", r.translation_text)
            }
            Task::ZeroShotClassification
            | Task::QuestionAnswering
            | Task::TableQuestionAnswering
            | Task::Conversational
            | Task::SpeechRecognition => decode::<Document>(body),
            Task::SentenceSimilarity => single("scores", decode::<Vec<f64>>(body)?),
            Task::ImageClassification | Task::AudioClassification => {
                single("classes", decode::<Vec<LabelScore>>(body)?)
            }
            Task::ImageSegmentation => single("segments", decode::<Vec<Segment>>(body)?),
            Task::ObjectDetection => single("objects", decode::<Vec<DetectedObject>>(body)?),
            Task::ImageToText => {
                let r: GeneratedText = first(decode(body)?)?;
                single("text", r.generated_text)
            }
        }
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| Error::decode(VENDOR, e.to_string()))
}

fn first<T>(items: Vec<T>) -> Result<T> {
    items
        .into_iter()
        .next()
        .ok_or_else(|| Error::decode(VENDOR, "empty response"))
}

fn single<T: Serialize>(key: &str, value: T) -> Result<Document> {
    let mut doc = Document::new();
    doc.insert(key.to_string(), serde_json::to_value(value)?);
    Ok(doc)
}

/// Hugging Face connector
pub struct HuggingFaceConnector {
    definitions: DefinitionSet,
}

impl HuggingFaceConnector {
    /// Load the embedded definitions
    pub fn new() -> Result<Self> {
        Ok(Self {
            definitions: DefinitionSet::from_json("huggingface", get_builtin("huggingface")?)?,
        })
    }
}

fn client(config: &HuggingFaceConfig) -> Result<HttpClient> {
    let config = HttpClientConfig::builder()
        .vendor(VENDOR)
        .bearer_auth(&config.api_key)
        .error_body::<HuggingFaceError>()
        .build();
    HttpClient::with_config(config)
}

#[async_trait]
impl Connector for HuggingFaceConnector {
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
        Ok(Box::new(HuggingFaceExecution {
            task: task.parse()?,
            config: from_config(config)?,
        }))
    }

    async fn test(&self, uid: Uuid, config: &Document) -> Result<ConnectionState> {
        self.definitions.by_uid(&uid)?;
        let config: HuggingFaceConfig = from_config(config)?;
        let resp = client(&config)?
            .send_unchecked(Method::GET, config.base_url(), RequestConfig::new())
            .await?;
        if resp.status.is_success() {
            Ok(ConnectionState::Connected)
        } else {
            Ok(ConnectionState::Disconnected)
        }
    }
}

struct HuggingFaceExecution {
    task: Task,
    config: HuggingFaceConfig,
}

impl HuggingFaceExecution {
    fn request_body(&self, mut input: Document) -> Result<RequestConfig> {
        let media_field = match self.task.request_kind() {
            RequestKind::Json => {
                input.remove("model");
                return Ok(RequestConfig::new().json(JsonValue::Object(input)));
            }
            RequestKind::Image => "image",
            RequestKind::Audio => "audio",
        };

        let encoded = input
            .get(media_field)
            .and_then(JsonValue::as_str)
            .ok_or_else(|| Error::input(format!("missing {media_field} in input")))?;
        let bytes = decode_base64(encoded)?;
        let mime = sniff_mime(&bytes);
        Ok(RequestConfig::new().bytes(mime, bytes))
    }

    async fn run_one(&self, client: &HttpClient, input: Document) -> Result<Document> {
        let model = input
            .get("model")
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string();
        let url = self.config.model_url(&model);
        let resp = client
            .request(Method::POST, &url, self.request_body(input)?)
            .await?;
        self.task.map_response(&resp.body)
    }
}

#[async_trait]
impl Execution for HuggingFaceExecution {
    async fn execute(&self, inputs: Vec<Document>) -> Result<Vec<Document>> {
        let client = client(&self.config)?;
        execute_each(inputs, |input| self.run_one(&client, input)).await
    }
}
