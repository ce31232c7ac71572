//! Instill Model REST gateway shapes

use crate::http::ErrorBody;
use crate::types::Document;
use serde::{Deserialize, Serialize};

/// Mode in which the backend address comes from `instill_model_backend`
pub const INTERNAL_MODE: &str = "Internal Mode";

pub const NAMESPACE_ORGANIZATION: &str = "NAMESPACE_ORGANIZATION";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstillConfig {
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub api_token: String,
    #[serde(default)]
    pub instill_user_uid: String,
    #[serde(default)]
    pub server_url: String,
    #[serde(default)]
    pub instill_model_backend: String,
}

impl InstillConfig {
    /// Address of the model backend
    pub fn server_url(&self) -> String {
        if self.mode == INTERNAL_MODE {
            let backend = self.instill_model_backend.as_str();
            if backend.contains("://") {
                return backend.to_string();
            }
            return format!("http://{backend}");
        }
        normalize_server_url(&self.server_url)
    }
}

/// Append the scheme's default port when the URL has none
pub fn normalize_server_url(raw: &str) -> String {
    let (scheme, rest, port) = if let Some(rest) = raw.strip_prefix("https://") {
        ("https://", rest, 443)
    } else if let Some(rest) = raw.strip_prefix("http://") {
        ("http://", rest, 80)
    } else {
        return raw.to_string();
    };

    let (authority, path) = match rest.find('/') {
        Some(i) => rest.split_at(i),
        None => (rest, ""),
    };
    if authority.contains(':') {
        return raw.to_string();
    }
    format!("{scheme}{authority}:{port}{path}")
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckNamespaceRequest<'a> {
    pub id: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckNamespaceResponse {
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl CheckNamespaceResponse {
    /// Collection name used in model resource paths
    pub fn collection(&self) -> &'static str {
        if self.kind == NAMESPACE_ORGANIZATION {
            "organizations"
        } else {
            "users"
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TriggerRequest {
    pub task_inputs: Vec<Document>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TriggerResponse {
    #[serde(default)]
    pub task_outputs: Vec<Document>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Model {
    pub name: String,
    #[serde(default)]
    pub task: String,
}

impl Model {
    /// `users/a/models/b` becomes `a/b`
    pub fn short_name(&self) -> Option<String> {
        let parts: Vec<&str> = self.name.split('/').collect();
        match parts.as_slice() {
            [_, ns, _, model, ..] => Some(format!("{ns}/{model}")),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListModelsResponse {
    #[serde(default)]
    pub models: Vec<Model>,
}

#[derive(Debug, Deserialize)]
pub struct InstillError {
    #[serde(default)]
    message: String,
}

impl ErrorBody for InstillError {
    fn message(&self) -> Option<String> {
        (!self.message.is_empty()).then(|| self.message.clone())
    }
}
