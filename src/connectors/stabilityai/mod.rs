//! Stability AI connector
//!
//! Text-to-image (JSON) and image-to-image (multipart) generation against
//! the v1 generation API.

mod types;

pub use types::*;

use crate::connector::{execute_each, Connector, Execution};
use crate::connectors::get_builtin;
use crate::definition::DefinitionSet;
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig, RequestConfig};
use crate::types::{
    decode_base64, from_config, from_document, sniff_mime, to_document, ConnectionState, Document,
};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use std::str::FromStr;
use uuid::Uuid;

const VENDOR: &str = "Stability AI";

/// Supported tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    TextToImage,
    ImageToImage,
}

impl FromStr for Task {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "TASK_TEXT_TO_IMAGE" => Ok(Task::TextToImage),
            "TASK_IMAGE_TO_IMAGE" => Ok(Task::ImageToImage),
            other => Err(Error::task_not_supported(other)),
        }
    }
}

/// Pair each prompt with its weight, defaulting to 1.0
pub fn weighted_prompts(prompts: &[String], weights: Option<&[f64]>) -> Result<Vec<TextPrompt>> {
    if prompts.is_empty() {
        return Err(Error::input("no text prompts given"));
    }
    Ok(prompts
        .iter()
        .enumerate()
        .map(|(i, text)| TextPrompt {
            text: text.clone(),
            weight: weights.and_then(|w| w.get(i)).copied().unwrap_or(1.0),
        })
        .collect())
}

fn generation_path(engine: &str, kind: &str) -> Result<String> {
    if engine.is_empty() {
        return Err(Error::input("no engine selected"));
    }
    Ok(format!("/v1/generation/{engine}/{kind}"))
}

/// Multipart form for image-to-image
///
/// Empty prompts are skipped and the remaining ones renumbered.
pub fn image_to_image_form(input: &ImageToImageInput, prompts: &[TextPrompt]) -> Result<Form> {
    let image = decode_base64(&input.init_image)?;
    let mime = sniff_mime(&image);
    let file = Part::bytes(image)
        .file_name("init_image")
        .mime_str(mime)
        .map_err(|e| Error::input(format!("invalid init_image: {e}")))?;

    let mut form = Form::new().part("init_image", file);
    let tuning = &input.tuning;

    let fields: [(&str, Option<String>); 11] = [
        ("cfg_scale", tuning.cfg_scale.map(|v| format!("{v:.6}"))),
        ("clip_guidance_preset", tuning.clip_guidance_preset.clone()),
        ("sampler", tuning.sampler.clone()),
        ("seed", tuning.seed.map(|v| v.to_string())),
        ("style_preset", tuning.style_preset.clone()),
        ("init_image_mode", input.init_image_mode.clone()),
        ("image_strength", input.image_strength.map(|v| format!("{v:.6}"))),
        ("step_schedule_start", input.step_schedule_start.map(|v| format!("{v:.6}"))),
        ("step_schedule_end", input.step_schedule_end.map(|v| format!("{v:.6}"))),
        ("samples", tuning.samples.map(|v| v.to_string())),
        ("steps", tuning.steps.map(|v| v.to_string())),
    ];
    for (name, value) in fields {
        if let Some(value) = value {
            form = form.text(name, value);
        }
    }

    for (i, prompt) in prompts.iter().filter(|p| !p.text.is_empty()).enumerate() {
        form = form
            .text(format!("text_prompts[{i}][text]"), prompt.text.clone())
            .text(
                format!("text_prompts[{i}][weight]"),
                format!("{:.6}", prompt.weight),
            );
    }

    Ok(form)
}

/// Stability AI connector
pub struct StabilityAiConnector {
    definitions: DefinitionSet,
}

impl StabilityAiConnector {
    /// Load the embedded definitions
    pub fn new() -> Result<Self> {
        Ok(Self {
            definitions: DefinitionSet::from_json("stabilityai", get_builtin("stabilityai")?)?,
        })
    }
}

fn client(config: &StabilityAiConfig) -> Result<HttpClient> {
    let config = HttpClientConfig::builder()
        .vendor(VENDOR)
        .base_url(config.base_url())
        .bearer_auth(&config.api_key)
        .error_body::<StabilityAiError>()
        .build();
    HttpClient::with_config(config)
}

#[async_trait]
impl Connector for StabilityAiConnector {
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
        Ok(Box::new(StabilityAiExecution {
            task: task.parse()?,
            config: from_config(config)?,
        }))
    }

    async fn test(&self, uid: Uuid, config: &Document) -> Result<ConnectionState> {
        self.definitions.by_uid(&uid)?;
        let config: StabilityAiConfig = from_config(config)?;
        let engines: Vec<Engine> = client(&config)?.get_json("/v1/engines/list").await?;
        if engines.is_empty() {
            return Ok(ConnectionState::Disconnected);
        }
        Ok(ConnectionState::Connected)
    }
}

struct StabilityAiExecution {
    task: Task,
    config: StabilityAiConfig,
}

impl StabilityAiExecution {
    async fn run_one(&self, client: &HttpClient, input: Document) -> Result<Document> {
        let resp: ImageTaskResponse = match self.task {
            Task::TextToImage => {
                let input: TextToImageInput = from_document(&input)?;
                let req = TextToImageRequest {
                    text_prompts: weighted_prompts(&input.prompts, input.weights.as_deref())?,
                    height: input.height,
                    width: input.width,
                    tuning: input.tuning,
                };
                let path = generation_path(&input.engine, "text-to-image")?;
                client.post_json(&path, &req).await?
            }
            Task::ImageToImage => {
                let input: ImageToImageInput = from_document(&input)?;
                let prompts = weighted_prompts(&input.prompts, input.weights.as_deref())?;
                let path = generation_path(&input.engine, "image-to-image")?;
                let form = image_to_image_form(&input, &prompts)?;
                client
                    .request_json(Method::POST, &path, RequestConfig::new().multipart(form))
                    .await?
            }
        };
        to_document(&ImageOutput::from(resp))
    }
}

#[async_trait]
impl Execution for StabilityAiExecution {
    async fn execute(&self, inputs: Vec<Document>) -> Result<Vec<Document>> {
        let client = client(&self.config)?;
        execute_each(inputs, |input| self.run_one(&client, input)).await
    }
}

#[cfg(test)]
mod tests;
