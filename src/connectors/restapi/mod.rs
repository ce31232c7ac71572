//! Generic REST API connector
//!
//! Sends one request per input to `base_url + endpoint_path` with the
//! configured authentication. Any HTTP status is a valid output: the status
//! code, headers and body are returned to the pipeline as they are.

mod types;

pub use types::*;

use crate::auth::Authentication;
use crate::connector::{execute_each, Connector, Execution};
use crate::connectors::get_builtin;
use crate::definition::{ConnectorDefinition, DefinitionSet};
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig, HttpResponse, RequestConfig};
use crate::types::{from_config, from_document, to_document, ConnectionState, Document, JsonValue};
use async_trait::async_trait;
use reqwest::Method;
use std::collections::BTreeMap;
use std::str::FromStr;
use uuid::Uuid;

const VENDOR: &str = "REST API";

/// Location of the response body schema inside a task's OpenAPI document
const OUTPUT_BODY_SCHEMA_PATH: [&str; 13] = [
    "paths",
    "/execute",
    "post",
    "responses",
    "200",
    "content",
    "application/json",
    "schema",
    "properties",
    "outputs",
    "items",
    "properties",
    "body",
];

/// Supported tasks, one per HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Get,
    Post,
    Patch,
    Put,
    Delete,
    Head,
    Options,
}

impl FromStr for Task {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "TASK_GET" => Ok(Task::Get),
            "TASK_POST" => Ok(Task::Post),
            "TASK_PATCH" => Ok(Task::Patch),
            "TASK_PUT" => Ok(Task::Put),
            "TASK_DELETE" => Ok(Task::Delete),
            "TASK_HEAD" => Ok(Task::Head),
            "TASK_OPTIONS" => Ok(Task::Options),
            other => Err(Error::task_not_supported(other)),
        }
    }
}

impl Task {
    pub fn method(self) -> Method {
        match self {
            Task::Get => Method::GET,
            Task::Post => Method::POST,
            Task::Patch => Method::PATCH,
            Task::Put => Method::PUT,
            Task::Delete => Method::DELETE,
            Task::Head => Method::HEAD,
            Task::Options => Method::OPTIONS,
        }
    }

    /// Whether a request body is sent for this method
    pub fn carries_body(self) -> bool {
        matches!(self, Task::Post | Task::Put | Task::Patch | Task::Delete)
    }
}

/// `content-type` becomes `Content-Type`
pub fn canonical_header_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Response as a task output; a body that is not JSON becomes a string
pub fn task_output(resp: &HttpResponse) -> TaskOutput {
    let mut header: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in &resp.headers {
        header
            .entry(canonical_header_name(name.as_str()))
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }

    let body = if resp.body.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&resp.body).unwrap_or_else(|_| JsonValue::String(resp.text()))
    };

    TaskOutput {
        status_code: resp.status.as_u16(),
        body,
        header,
    }
}

/// Replace the response body schema of `task` with `schema`
///
/// Leaves the definition unchanged when any segment of the path is missing.
pub fn patch_output_body_schema(def: &mut ConnectorDefinition, task: &str, schema: JsonValue) {
    let mut node = def.spec.openapi_specifications.get_mut(task);
    for key in OUTPUT_BODY_SCHEMA_PATH {
        node = node.and_then(|n| n.get_mut(key));
    }
    if let Some(node) = node {
        *node = schema;
    }
}

fn client(config: &RestApiConfig) -> Result<HttpClient> {
    let auth = Authentication::from_value(&config.authentication)?;
    let http = HttpClientConfig::builder().vendor(VENDOR).build();
    HttpClient::with_auth(http, auth)
}

/// REST API connector
pub struct RestApiConnector {
    definitions: DefinitionSet,
}

impl RestApiConnector {
    /// Load the embedded definitions
    pub fn new() -> Result<Self> {
        Ok(Self {
            definitions: DefinitionSet::from_json("restapi", get_builtin("restapi")?)?,
        })
    }
}

#[async_trait]
impl Connector for RestApiConnector {
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
        let task = task.parse()?;
        let config: RestApiConfig = from_config(config)?;
        let client = client(&config)?;
        Ok(Box::new(RestApiExecution {
            task,
            base_url: config.base_url,
            client,
        }))
    }

    async fn test(&self, uid: Uuid, config: &Document) -> Result<ConnectionState> {
        self.definitions.by_uid(&uid)?;
        let config: RestApiConfig = from_config(config)?;
        client(&config)?
            .send_unchecked(Method::GET, &config.base_url, RequestConfig::new())
            .await?;
        Ok(ConnectionState::Connected)
    }

    async fn definition_by_uid(
        &self,
        uid: &Uuid,
        _resource_config: Option<&Document>,
        component_config: Option<&Document>,
    ) -> Result<ConnectorDefinition> {
        let mut def = self.definitions.by_uid(uid)?.clone();
        let Some(component) = component_config else {
            return Ok(def);
        };
        let task = component.get("task").and_then(JsonValue::as_str);
        let schema = component
            .get("input")
            .and_then(|i| i.get("output_body_schema"))
            .and_then(JsonValue::as_str);

        if let (Some(task), Some(schema)) = (task, schema) {
            let schema = serde_json::from_str(schema)
                .unwrap_or_else(|_| JsonValue::Object(Default::default()));
            patch_output_body_schema(&mut def, task, schema);
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

struct RestApiExecution {
    task: Task,
    base_url: String,
    client: HttpClient,
}

impl RestApiExecution {
    async fn run_one(&self, input: Document) -> Result<Document> {
        let input: TaskInput = from_document(&input)?;
        let url = format!(
            "{}{}",
            self.base_url,
            input.endpoint_path.as_deref().unwrap_or_default()
        );

        let mut req = RequestConfig::new();
        if self.task.carries_body() {
            if let Some(body) = input.body.filter(|b| !b.is_empty()) {
                req = req.json(JsonValue::Object(body));
            }
        }

        let resp = self
            .client
            .send_unchecked(self.task.method(), &url, req)
            .await?;
        to_document(&task_output(&resp))
    }
}

#[async_trait]
impl Execution for RestApiExecution {
    async fn execute(&self, inputs: Vec<Document>) -> Result<Vec<Document>> {
        execute_each(inputs, |input| self.run_one(input)).await
    }
}

#[cfg(test)]
mod tests;
