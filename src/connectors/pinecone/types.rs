//! Pinecone request and response shapes

use crate::http::ErrorBody;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Resource configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PineconeConfig {
    /// API key sent in the `Api-Key` header
    #[serde(default)]
    pub api_key: String,
    /// Index URL
    #[serde(default)]
    pub url: String,
}

/// `TASK_QUERY` input
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryInput {
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub top_k: i64,
    #[serde(default)]
    pub vector: Vec<f64>,
    #[serde(default)]
    pub include_values: bool,
    #[serde(default)]
    pub include_metadata: bool,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub filter: Option<Value>,
    /// Matches scoring below this are dropped
    #[serde(default)]
    pub min_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub namespace: String,
    pub top_k: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub vector: Vec<f64>,
    pub include_values: bool,
    pub include_metadata: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
}

impl From<QueryInput> for QueryRequest {
    fn from(input: QueryInput) -> Self {
        // Pinecone accepts either an id or a vector, never both.
        let vector = if input.id.is_empty() {
            input.vector
        } else {
            Vec::new()
        };

        Self {
            namespace: input.namespace,
            top_k: input.top_k,
            vector,
            include_values: input.include_values,
            include_metadata: input.include_metadata,
            id: input.id,
            filter: input.filter,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    #[serde(flatten)]
    pub vector: Vector,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub matches: Vec<Match>,
}

impl QueryResponse {
    /// Drop matches scoring below `min_score`
    pub fn filter_by_score(mut self, min_score: Option<f64>) -> Self {
        if let Some(min) = min_score {
            self.matches.retain(|m| m.score >= min);
        }
        self
    }
}

/// `TASK_UPSERT` input
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertInput {
    #[serde(flatten)]
    pub vector: Vector,
    #[serde(default)]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpsertRequest {
    pub vectors: Vec<Vector>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpsertResponse {
    #[serde(rename = "upsertedCount", default)]
    pub upserted_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpsertOutput {
    pub upserted_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct PineconeError {
    #[serde(default)]
    message: String,
}

impl ErrorBody for PineconeError {
    fn message(&self) -> Option<String> {
        Some(self.message.clone())
    }
}
