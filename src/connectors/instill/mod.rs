//! Instill Model connector
//!
//! Triggers models served by an Instill Model backend through its REST
//! gateway. The model namespace is resolved once per batch, then every
//! input is sent as its own single-element trigger request.

mod types;

pub use types::*;

use crate::connector::{execute_each, Connector, Execution};
use crate::connectors::get_builtin;
use crate::definition::{ConnectorDefinition, DefinitionSet};
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig};
use crate::types::{from_config, trim_base64_mime, ConnectionState, Document, JsonValue};
use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::debug;
use uuid::Uuid;

const VENDOR: &str = "Instill AI";

const MODELS_PATH: &str = "/model/v1alpha/models";

/// Supported tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Unspecified,
    Classification,
    Detection,
    Keypoint,
    Ocr,
    InstanceSegmentation,
    SemanticSegmentation,
    TextToImage,
    TextGeneration,
    TextGenerationChat,
    VisualQuestionAnswering,
    ImageToImage,
}

impl FromStr for Task {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "TASK_UNSPECIFIED" => Task::Unspecified,
            "TASK_CLASSIFICATION" => Task::Classification,
            "TASK_DETECTION" => Task::Detection,
            "TASK_KEYPOINT" => Task::Keypoint,
            "TASK_OCR" => Task::Ocr,
            "TASK_INSTANCE_SEGMENTATION" => Task::InstanceSegmentation,
            "TASK_SEMANTIC_SEGMENTATION" => Task::SemanticSegmentation,
            "TASK_TEXT_TO_IMAGE" => Task::TextToImage,
            "TASK_TEXT_GENERATION" => Task::TextGeneration,
            "TASK_TEXT_GENERATION_CHAT" => Task::TextGenerationChat,
            "TASK_VISUAL_QUESTION_ANSWERING" => Task::VisualQuestionAnswering,
            "TASK_IMAGE_TO_IMAGE" => Task::ImageToImage,
            other => return Err(Error::task_not_supported(other)),
        })
    }
}

impl Task {
    /// Field naming this task in trigger inputs and outputs
    pub fn key(self) -> &'static str {
        match self {
            Task::Unspecified => "unspecified",
            Task::Classification => "classification",
            Task::Detection => "detection",
            Task::Keypoint => "keypoint",
            Task::Ocr => "ocr",
            Task::InstanceSegmentation => "instance_segmentation",
            Task::SemanticSegmentation => "semantic_segmentation",
            Task::TextToImage => "text_to_image",
            Task::TextGeneration => "text_generation",
            Task::TextGenerationChat => "text_generation_chat",
            Task::VisualQuestionAnswering => "visual_question_answering",
            Task::ImageToImage => "image_to_image",
        }
    }
}

/// Split `namespace/model`
pub fn split_model_name(name: &str) -> Result<(&str, &str)> {
    match name.split_once('/') {
        Some((ns, model)) if !ns.is_empty() && !model.is_empty() => Ok((ns, model)),
        _ => Err(Error::input(format!(
            "model_name must be <namespace>/<model>, got \"{name}\""
        ))),
    }
}

/// Set `enum` on every `model_name` property below `schema`
pub fn add_model_enum(schema: &mut JsonValue, names: &[String]) {
    match schema {
        JsonValue::Object(map) => {
            for (key, value) in map.iter_mut() {
                if key == "model_name" {
                    if let Some(prop) = value.as_object_mut() {
                        prop.insert("enum".to_string(), JsonValue::from(names.to_vec()));
                    }
                }
                add_model_enum(value, names);
            }
        }
        JsonValue::Array(items) => {
            for item in items {
                add_model_enum(item, names);
            }
        }
        _ => {}
    }
}

/// Attach model names to the component schema of each matching task
pub fn patch_model_enums(def: &mut ConnectorDefinition, by_task: &BTreeMap<String, Vec<String>>) {
    let Some(variants) = def
        .spec
        .component_specification
        .get_mut("oneOf")
        .and_then(JsonValue::as_array_mut)
    else {
        return;
    };

    for variant in variants {
        let task = variant
            .pointer("/properties/task/const")
            .and_then(JsonValue::as_str)
            .map(str::to_string);
        if let Some(names) = task.and_then(|t| by_task.get(&t)) {
            add_model_enum(variant, names);
        }
    }
}

fn trimmed(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::String(s) => JsonValue::from(trim_base64_mime(s)),
        other => other.clone(),
    }
}

/// `{param_name, param_value}` pairs, both strings
fn extra_params(value: &JsonValue) -> Result<JsonValue> {
    let items = value
        .as_array()
        .ok_or_else(|| Error::input("extra_params must be a list"))?;
    items
        .iter()
        .map(|item| {
            let name = item.get("param_name").and_then(JsonValue::as_str);
            let value = item.get("param_value").and_then(JsonValue::as_str);
            match (name, value) {
                (Some(name), Some(value)) => {
                    Ok(json!({"param_name": name, "param_value": value}))
                }
                _ => Err(Error::input(
                    "extra_params entries need string param_name and param_value",
                )),
            }
        })
        .collect::<Result<Vec<_>>>()
        .map(JsonValue::Array)
}

/// One chat content item; images move under `image_url.prompt_image_base64`
fn chat_content(item: &JsonValue) -> JsonValue {
    let kind = item.get("type").and_then(JsonValue::as_str).unwrap_or_default();
    if kind == "text" {
        return json!({
            "type": kind,
            "text": item.get("text").cloned().unwrap_or_default(),
        });
    }
    let url = item
        .pointer("/image_url/url")
        .map(trimmed)
        .unwrap_or_default();
    json!({"type": kind, "image_url": {"prompt_image_base64": url}})
}

/// Chat messages with image contents rewritten for the gateway
fn chat_history(value: &JsonValue) -> JsonValue {
    let Some(messages) = value.as_array() else {
        return value.clone();
    };
    let messages = messages
        .iter()
        .map(|message| {
            let contents: Vec<JsonValue> = message
                .get("content")
                .and_then(JsonValue::as_array)
                .map(|items| items.iter().map(chat_content).collect())
                .unwrap_or_default();
            json!({
                "role": message.get("role").cloned().unwrap_or_default(),
                "content": contents,
            })
        })
        .collect();
    JsonValue::Array(messages)
}

/// Translate a pipeline input into the gateway's field names for `task`
pub fn task_input(task: Task, input: Document) -> Result<Document> {
    let mut out = Document::new();
    for (key, value) in input {
        match key.as_str() {
            "model_name" => {}
            "extra_params" => {
                out.insert(key, extra_params(&value)?);
            }
            "image_base64" if task == Task::ImageToImage => {
                out.insert("prompt_image_base64".to_string(), trimmed(&value));
            }
            "image_base64" | "prompt_image_base64" => {
                out.insert(key, trimmed(&value));
            }
            "prompt_images" => {
                let images = value
                    .as_array()
                    .map(|items| {
                        items
                            .iter()
                            .map(|img| json!({"prompt_image_base64": trimmed(img)}))
                            .collect()
                    })
                    .unwrap_or_default();
                out.insert(key, JsonValue::Array(images));
            }
            "chat_history" => {
                out.insert(key, chat_history(&value));
            }
            _ => {
                out.insert(key, value);
            }
        }
    }
    Ok(out)
}

fn client(config: &InstillConfig) -> Result<HttpClient> {
    let mut builder = HttpClientConfig::builder()
        .vendor(VENDOR)
        .base_url(config.server_url())
        .bearer_auth(&config.api_token)
        .error_body::<InstillError>();
    if !config.instill_user_uid.is_empty() {
        builder = builder.header("Instill-User-Uid", &config.instill_user_uid);
    }
    HttpClient::with_config(builder.build())
}

/// Instill Model connector
pub struct InstillConnector {
    definitions: DefinitionSet,
}

impl InstillConnector {
    /// Load the embedded definitions
    pub fn new() -> Result<Self> {
        Ok(Self {
            definitions: DefinitionSet::from_json("instill", get_builtin("instill")?)?,
        })
    }

    async fn models_by_task(&self, config: &InstillConfig) -> Result<BTreeMap<String, Vec<String>>> {
        let resp: ListModelsResponse = client(config)?.get_json(MODELS_PATH).await?;
        let mut by_task: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for model in &resp.models {
            if let Some(name) = model.short_name() {
                by_task.entry(model.task.clone()).or_default().push(name);
            }
        }
        Ok(by_task)
    }
}

#[async_trait]
impl Connector for InstillConnector {
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
        Ok(Box::new(InstillExecution {
            task: task.parse()?,
            config: from_config(config)?,
        }))
    }

    async fn test(&self, uid: Uuid, config: &Document) -> Result<ConnectionState> {
        self.definitions.by_uid(&uid)?;
        let config: InstillConfig = from_config(config)?;
        let _: ListModelsResponse = client(&config)?.get_json(MODELS_PATH).await?;
        Ok(ConnectionState::Connected)
    }

    async fn definition_by_uid(
        &self,
        uid: &Uuid,
        resource_config: Option<&Document>,
        _component_config: Option<&Document>,
    ) -> Result<ConnectorDefinition> {
        let mut def = self.definitions.by_uid(uid)?.clone();
        if let Some(resource_config) = resource_config {
            let config: InstillConfig = from_config(resource_config)?;
            let by_task = self.models_by_task(&config).await?;
            debug!(tasks = by_task.len(), "Listing models for definition");
            patch_model_enums(&mut def, &by_task);
        }
        Ok(def)
    }

    async fn definition_by_id(
        &self,
        id: &str,
        resource_config: Option<&Document>,
        component_config: Option<&Document>,
    ) -> Result<ConnectorDefinition> {
        let uid = self.definitions.by_id(id)?.uid;
        self.definition_by_uid(&uid, resource_config, component_config)
            .await
    }
}

struct InstillExecution {
    task: Task,
    config: InstillConfig,
}

impl InstillExecution {
    /// Resolve `ns/model` into the model's trigger path
    async fn trigger_path(&self, client: &HttpClient, model_name: &str) -> Result<String> {
        let (ns, model) = split_model_name(model_name)?;
        let resp: CheckNamespaceResponse = client
            .post_json("/core/v1beta/check-namespace", &CheckNamespaceRequest { id: ns })
            .await?;
        Ok(format!(
            "/model/v1alpha/{}/{ns}/models/{model}/trigger",
            resp.collection()
        ))
    }

    async fn trigger(&self, client: &HttpClient, path: &str, input: Document) -> Result<Document> {
        let key = self.task.key();
        let mut request_input = Document::new();
        request_input.insert(
            key.to_string(),
            JsonValue::Object(task_input(self.task, input)?),
        );

        let resp: TriggerResponse = client
            .post_json(
                path,
                &TriggerRequest {
                    task_inputs: vec![request_input],
                },
            )
            .await?;

        resp.task_outputs
            .into_iter()
            .next()
            .and_then(|mut out| out.remove(key))
            .and_then(|out| match out {
                JsonValue::Object(map) => Some(map),
                _ => None,
            })
            .ok_or_else(|| Error::decode(VENDOR, format!("no {key} output for {path}")))
    }
}

#[async_trait]
impl Execution for InstillExecution {
    async fn execute(&self, inputs: Vec<Document>) -> Result<Vec<Document>> {
        let Some(first) = inputs.first() else {
            return Ok(Vec::new());
        };
        let model_name = first
            .get("model_name")
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string();

        let client = client(&self.config)?;
        let path = self
            .trigger_path(&client, &model_name)
            .await
            .map_err(|e| Error::batch(0, Vec::new(), e))?;

        execute_each(inputs, |input| self.trigger(&client, &path, input)).await
    }
}

#[cfg(test)]
mod tests;
