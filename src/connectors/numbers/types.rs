//! Numbers Protocol request and response shapes

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_API_URL: &str = "https://api.numbersprotocol.io";
pub const DEFAULT_COMMIT_URL: &str = "https://eo883tj75azolos.m.pipedream.net";

pub const PIN_PATH: &str = "/api/v3/assets/";
pub const ME_PATH: &str = "/api/v3/auth/users/me";

pub const ASSET_PROFILE_URL: &str = "https://verify.numbersprotocol.io/asset-profile?nid=";

/// Recorded as the tool the asset was generated through
pub const GENERATED_THROUGH: &str = "https://console.instill.tech";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NumbersConfig {
    #[serde(default)]
    pub capture_token: String,
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub commit_url: Option<String>,
}

impl NumbersConfig {
    pub fn api_url(&self) -> &str {
        match self.api_url.as_deref() {
            Some(url) if !url.is_empty() => url,
            _ => DEFAULT_API_URL,
        }
    }

    pub fn commit_url(&self) -> &str {
        match self.commit_url.as_deref() {
            Some(url) if !url.is_empty() => url,
            _ => DEFAULT_COMMIT_URL,
        }
    }

    pub fn authorization(&self) -> String {
        format!("token {}", self.capture_token)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct License {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomInput {
    #[serde(default)]
    pub digital_source_type: Option<String>,
    #[serde(default)]
    pub mining_preference: Option<String>,
    #[serde(default)]
    pub generated_by: Option<String>,
    #[serde(default)]
    pub license: Option<License>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitInput {
    pub images: Vec<String>,
    #[serde(default)]
    pub asset_creator: Option<String>,
    #[serde(default, rename = "abstract")]
    pub summary: Option<String>,
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub custom: Option<CustomInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitCustom {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digital_source_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mining_preference: Option<String>,
    pub generated_through: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
    #[serde(rename = "instillMetadata", skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl From<CustomInput> for CommitCustom {
    fn from(c: CustomInput) -> Self {
        Self {
            digital_source_type: c.digital_source_type,
            mining_preference: c.mining_preference,
            generated_through: GENERATED_THROUGH.to_string(),
            generated_by: c.generated_by,
            license: c.license,
            metadata: c.metadata,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    pub asset_cid: String,
    pub asset_sha256: String,
    pub encoding_format: String,
    pub asset_timestamp_created: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_creator: Option<String>,
    #[serde(rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom: Option<CommitCustom>,
    pub testnet: bool,
}

#[derive(Debug, Deserialize)]
pub struct PinResponse {
    #[serde(default)]
    pub cid: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitResponse {
    pub asset_cid: String,
    pub asset_tree_cid: String,
}

#[derive(Debug, Serialize)]
pub struct CommitOutput {
    pub asset_urls: Vec<String>,
}
