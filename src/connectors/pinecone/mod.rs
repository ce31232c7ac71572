//! Pinecone vector database connector
//!
//! Queries an index by vector or by record ID and upserts single vectors.

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

const VENDOR: &str = "Pinecone";

/// Supported tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Query,
    Upsert,
}

impl FromStr for Task {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "TASK_QUERY" => Ok(Task::Query),
            "TASK_UPSERT" => Ok(Task::Upsert),
            other => Err(Error::task_not_supported(other)),
        }
    }
}

/// Pinecone connector
pub struct PineconeConnector {
    definitions: DefinitionSet,
}

impl PineconeConnector {
    /// Load the embedded definitions
    pub fn new() -> Result<Self> {
        Ok(Self {
            definitions: DefinitionSet::from_json("pinecone", get_builtin("pinecone")?)?,
        })
    }
}

#[async_trait]
impl Connector for PineconeConnector {
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
        Ok(Box::new(PineconeExecution {
            task: task.parse()?,
            config: from_config(config)?,
        }))
    }

    async fn test(&self, uid: Uuid, _config: &Document) -> Result<ConnectionState> {
        self.definitions.by_uid(&uid)?;
        Ok(ConnectionState::Connected)
    }
}

struct PineconeExecution {
    task: Task,
    config: PineconeConfig,
}

impl PineconeExecution {
    fn client(&self) -> Result<HttpClient> {
        let config = HttpClientConfig::builder()
            .vendor(VENDOR)
            .base_url(&self.config.url)
            .header("Api-Key", &self.config.api_key)
            .error_body::<PineconeError>()
            .build();
        HttpClient::with_config(config)
    }

    async fn run_one(&self, client: &HttpClient, input: Document) -> Result<Document> {
        match self.task {
            Task::Query => {
                let input: QueryInput = from_document(&input)?;
                let min_score = input.min_score;
                let req = QueryRequest::from(input);
                let resp: QueryResponse = client.post_json("/query", &req).await?;
                to_document(&resp.filter_by_score(min_score))
            }
            Task::Upsert => {
                let input: UpsertInput = from_document(&input)?;
                let req = UpsertRequest {
                    vectors: vec![input.vector],
                    namespace: input.namespace,
                };
                let resp: UpsertResponse = client.post_json("/vectors/upsert", &req).await?;
                to_document(&UpsertOutput {
                    upserted_count: resp.upserted_count,
                })
            }
        }
    }
}

#[async_trait]
impl Execution for PineconeExecution {
    async fn execute(&self, inputs: Vec<Document>) -> Result<Vec<Document>> {
        let client = self.client()?;
        execute_each(inputs, |input| self.run_one(&client, input)).await
    }
}
