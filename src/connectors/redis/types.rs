//! Chat memory records and task shapes

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_PORT: u16 = 6379;
pub const DEFAULT_LATEST_K: usize = 10;

/// Hash holding one system message per session
pub const SYSTEM_MESSAGES_KEY: &str = "system_messages";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RedisConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, Value>>,
}

/// Stored form of a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedMessage {
    #[serde(flatten)]
    pub message: Message,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessageWriteInput {
    pub session_id: String,
    #[serde(flatten)]
    pub message: Message,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessageWriteOutput {
    pub status: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatHistoryRetrieveInput {
    pub session_id: String,
    #[serde(default)]
    pub latest_k: Option<i64>,
    #[serde(default)]
    pub include_system_message: bool,
}

impl ChatHistoryRetrieveInput {
    /// Requested turn count, with non-positive values meaning the default
    pub fn latest_k(&self) -> usize {
        match self.latest_k {
            Some(k) if k > 0 => usize::try_from(k).unwrap_or(usize::MAX),
            _ => DEFAULT_LATEST_K,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatHistoryRetrieveOutput {
    pub messages: Vec<Message>,
    pub status: bool,
}

/// Sorted set holding a session's non-system messages
pub fn timestamps_key(session_id: &str) -> String {
    format!("{session_id}:timestamps")
}
