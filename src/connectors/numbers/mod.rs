//! Numbers Protocol connector
//!
//! Registers images on the Numbers blockchain: each image is pinned to
//! IPFS through the Capture API, then committed with its provenance
//! metadata. The output is one asset profile URL per image.

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
use reqwest::{Method, StatusCode};
use sha2::{Digest, Sha256};
use std::str::FromStr;
use tracing::debug;
use uuid::Uuid;

const VENDOR: &str = "Numbers Protocol";

/// Supported tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Commit,
}

impl FromStr for Task {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "TASK_COMMIT" => Ok(Task::Commit),
            other => Err(Error::task_not_supported(other)),
        }
    }
}

/// File extension for an uploaded asset
fn extension(mime: &str) -> &'static str {
    match mime {
        "image/png" => ".png",
        "image/jpeg" => ".jpg",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        _ => "",
    }
}

/// Hex-encoded SHA-256 of `data`
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Numbers Protocol connector
pub struct NumbersConnector {
    definitions: DefinitionSet,
}

impl NumbersConnector {
    /// Load the embedded definitions
    pub fn new() -> Result<Self> {
        Ok(Self {
            definitions: DefinitionSet::from_json("numbers", get_builtin("numbers")?)?,
        })
    }
}

fn client(config: &NumbersConfig) -> Result<HttpClient> {
    let config = HttpClientConfig::builder()
        .vendor(VENDOR)
        .base_url(config.api_url())
        .header("Authorization", config.authorization())
        .build();
    HttpClient::with_config(config)
}

#[async_trait]
impl Connector for NumbersConnector {
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
        Ok(Box::new(NumbersExecution {
            config: from_config(config)?,
        }))
    }

    async fn test(&self, uid: Uuid, config: &Document) -> Result<ConnectionState> {
        self.definitions.by_uid(&uid)?;
        let config: NumbersConfig = from_config(config)?;
        let resp = client(&config)?
            .request(Method::GET, ME_PATH, RequestConfig::new())
            .await?;
        if resp.status == StatusCode::OK {
            Ok(ConnectionState::Connected)
        } else {
            Ok(ConnectionState::Error)
        }
    }
}

struct NumbersExecution {
    config: NumbersConfig,
}

impl NumbersExecution {
    /// Upload the asset, returning its CID
    async fn pin(&self, client: &HttpClient, data: &[u8]) -> Result<String> {
        let mime = sniff_mime(data);
        let file = Part::bytes(data.to_vec())
            .file_name(format!("{}{}", Uuid::new_v4(), extension(mime)))
            .mime_str(mime)
            .map_err(|e| Error::input(format!("invalid image payload: {e}")))?;

        let resp = client
            .request(
                Method::POST,
                PIN_PATH,
                RequestConfig::new().multipart(Form::new().part("asset_file", file)),
            )
            .await?;
        if resp.status != StatusCode::CREATED {
            return Err(Error::vendor(VENDOR, resp.status.as_u16(), resp.text()));
        }

        let pinned: PinResponse = client.decode(&resp)?;
        pinned
            .cid
            .ok_or_else(|| Error::decode(VENDOR, "pin response has no cid"))
    }

    async fn commit(&self, client: &HttpClient, commit: &Commit) -> Result<CommitResponse> {
        let resp = client
            .request(
                Method::POST,
                self.config.commit_url(),
                RequestConfig::new().json(serde_json::to_value(commit)?),
            )
            .await?;
        if resp.status != StatusCode::OK {
            return Err(Error::vendor(VENDOR, resp.status.as_u16(), resp.text()));
        }
        client.decode(&resp)
    }

    async fn run_one(&self, client: &HttpClient, input: Document) -> Result<Document> {
        let input: CommitInput = from_document(&input)?;
        let custom = input.custom.map(CommitCustom::from);

        let mut asset_urls = Vec::with_capacity(input.images.len());
        for image in &input.images {
            let data = decode_base64(image)?;
            let cid = self.pin(client, &data).await?;
            debug!(cid = %cid, bytes = data.len(), "Pinned asset");

            let commit = Commit {
                asset_cid: cid,
                asset_sha256: sha256_hex(&data),
                encoding_format: sniff_mime(&data).to_string(),
                asset_timestamp_created: chrono::Utc::now().timestamp(),
                asset_creator: input.asset_creator.clone(),
                summary: input.summary.clone(),
                headline: input.headline.clone(),
                custom: custom.clone(),
                testnet: false,
            };
            let committed = self.commit(client, &commit).await?;
            debug!(asset_tree_cid = %committed.asset_tree_cid, "Committed asset");
            asset_urls.push(format!("{ASSET_PROFILE_URL}{}", committed.asset_cid));
        }

        to_document(&CommitOutput { asset_urls })
    }
}

#[async_trait]
impl Execution for NumbersExecution {
    async fn execute(&self, inputs: Vec<Document>) -> Result<Vec<Document>> {
        let client = client(&self.config)?;
        execute_each(inputs, |input| self.run_one(&client, input)).await
    }
}
