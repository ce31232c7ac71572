//! Archetype AI connector

mod types;

pub use types::*;

use crate::connector::{execute_each, Connector, Execution};
use crate::connectors::get_builtin;
use crate::definition::DefinitionSet;
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig};
use crate::types::{from_config, from_document, to_document, ConnectionState, Document};
use async_trait::async_trait;
use std::str::FromStr;
use uuid::Uuid;

const VENDOR: &str = "Archetype AI";

/// Supported tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Summarize,
}

impl FromStr for Task {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "TASK_SUMMARIZE" => Ok(Task::Summarize),
            other => Err(Error::task_not_supported(other)),
        }
    }
}

/// Archetype AI connector
pub struct ArchetypeAiConnector {
    definitions: DefinitionSet,
}

impl ArchetypeAiConnector {
    /// Load the embedded definitions
    pub fn new() -> Result<Self> {
        Ok(Self {
            definitions: DefinitionSet::from_json("archetypeai", get_builtin("archetypeai")?)?,
        })
    }
}

#[async_trait]
impl Connector for ArchetypeAiConnector {
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
        Ok(Box::new(ArchetypeAiExecution {
            task: task.parse()?,
            config: from_config(config)?,
        }))
    }

    async fn test(&self, uid: Uuid, _config: &Document) -> Result<ConnectionState> {
        self.definitions.by_uid(&uid)?;
        Ok(ConnectionState::Connected)
    }
}

struct ArchetypeAiExecution {
    task: Task,
    config: ArchetypeAiConfig,
}

impl ArchetypeAiExecution {
    fn client(&self) -> Result<HttpClient> {
        let config = HttpClientConfig::builder()
            .vendor(VENDOR)
            .base_url(self.config.base_path())
            .bearer_auth(&self.config.api_key)
            .error_body::<ArchetypeAiError>()
            .build();
        HttpClient::with_config(config)
    }

    async fn run_one(&self, client: &HttpClient, input: Document) -> Result<Document> {
        match self.task {
            Task::Summarize => {
                let params: SummarizeParams = from_document(&input)?;
                let resp: SummarizeResponse =
                    client.post_json("/v0.3/summarize", &params).await?;

                // A 2xx answer can still carry a failed query.
                if resp.status != STATUS_COMPLETED {
                    return Err(Error::vendor_failure(format!(
                        "{VENDOR} didn't complete query {}: status is \"{}\".",
                        resp.query_id, resp.status
                    )));
                }

                to_document(&SummarizeOutput {
                    response: resp.response.processed_text,
                })
            }
        }
    }
}

#[async_trait]
impl Execution for ArchetypeAiExecution {
    async fn execute(&self, inputs: Vec<Document>) -> Result<Vec<Document>> {
        let client = self.client()?;
        execute_each(inputs, |input| self.run_one(&client, input)).await
    }
}
