//! Google Cloud Storage connector
//!
//! Uploads base64 payloads as objects in a single bucket through
//! `object_store`.

mod types;

pub use types::*;

use crate::connector::{execute_each, Connector, Execution};
use crate::connectors::get_builtin;
use crate::definition::DefinitionSet;
use crate::error::{Error, Result};
use crate::types::{decode_base64, from_config, from_document, to_document, ConnectionState, Document};
use async_trait::async_trait;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

const VENDOR: &str = "Google Cloud Storage";

/// Supported tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Upload,
}

impl FromStr for Task {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "TASK_UPLOAD" => Ok(Task::Upload),
            other => Err(Error::task_not_supported(other)),
        }
    }
}

fn storage_error(e: object_store::Error) -> Error {
    Error::storage(e.to_string())
}

/// Object store for the configured bucket
pub fn bucket_store(config: &GcsConfig) -> Result<Arc<dyn ObjectStore>> {
    if config.bucket_name.is_empty() {
        return Err(Error::missing_field("bucket_name"));
    }
    let store = GoogleCloudStorageBuilder::new()
        .with_service_account_key(&config.json_key)
        .with_bucket_name(&config.bucket_name)
        .build()
        .map_err(|e| Error::config(format!("invalid Google Cloud Storage credentials: {e}")))?;
    Ok(Arc::new(store))
}

/// Write one object and describe where it landed
pub async fn upload(
    store: &dyn ObjectStore,
    bucket: &str,
    input: &UploadInput,
) -> Result<UploadOutput> {
    let data = decode_base64(&input.data)?;
    let size = data.len();
    store
        .put(&Path::from(input.object_name.as_str()), PutPayload::from(data))
        .await
        .map_err(storage_error)?;
    info!(bucket, object = %input.object_name, bytes = size, "Uploaded object");
    Ok(UploadOutput::success(bucket, &input.object_name))
}

/// Google Cloud Storage connector
pub struct GcsConnector {
    definitions: DefinitionSet,
}

impl GcsConnector {
    /// Load the embedded definitions
    pub fn new() -> Result<Self> {
        Ok(Self {
            definitions: DefinitionSet::from_json("gcs", get_builtin("gcs")?)?,
        })
    }
}

#[async_trait]
impl Connector for GcsConnector {
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
        let _task: Task = task.parse()?;
        let config: GcsConfig = from_config(config)?;
        Ok(Box::new(GcsExecution {
            store: bucket_store(&config)?,
            bucket: config.bucket_name,
        }))
    }

    async fn test(&self, uid: Uuid, config: &Document) -> Result<ConnectionState> {
        self.definitions.by_uid(&uid)?;
        let config: GcsConfig = from_config(config)?;
        bucket_store(&config)?
            .list_with_delimiter(None)
            .await
            .map_err(storage_error)?;
        Ok(ConnectionState::Connected)
    }
}

struct GcsExecution {
    bucket: String,
    store: Arc<dyn ObjectStore>,
}

#[async_trait]
impl Execution for GcsExecution {
    async fn execute(&self, inputs: Vec<Document>) -> Result<Vec<Document>> {
        execute_each(inputs, |input| async move {
            let input: UploadInput = from_document(&input)?;
            to_document(&upload(self.store.as_ref(), &self.bucket, &input).await?)
        })
        .await
    }
}

#[cfg(test)]
mod tests;
