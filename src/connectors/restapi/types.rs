//! REST API task shapes

use crate::types::JsonValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RestApiConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub authentication: JsonValue,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskInput {
    #[serde(default)]
    pub endpoint_path: Option<String>,
    #[serde(default)]
    pub body: Option<serde_json::Map<String, JsonValue>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskOutput {
    pub status_code: u16,
    pub body: JsonValue,
    pub header: BTreeMap<String, Vec<String>>,
}
