//! Google Cloud Storage config and task shapes

use serde::{Deserialize, Serialize};

pub const STATUS_SUCCESS: &str = "success";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GcsConfig {
    /// Service account key file contents
    #[serde(default)]
    pub json_key: String,
    #[serde(default)]
    pub bucket_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadInput {
    pub object_name: String,
    /// Base64 payload, optionally as a data URL
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadOutput {
    pub status: String,
    pub gsutil_uri: String,
    pub public_url: String,
    pub authenticated_url: String,
}

impl UploadOutput {
    pub fn success(bucket: &str, object: &str) -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
            gsutil_uri: format!("gs://{bucket}/{object}"),
            public_url: format!("https://storage.googleapis.com/{bucket}/{object}"),
            authenticated_url: format!("https://storage.cloud.google.com/{bucket}/{object}"),
        }
    }
}
