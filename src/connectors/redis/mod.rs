//! Redis chat memory connector
//!
//! Stores conversation turns per session: the system message in a hash,
//! every other message in a sorted set scored by its unix timestamp.
//! Store failures are reported through `status: false` in the output
//! rather than as execution errors.

mod store;
mod types;

pub use store::{connection_url, ChatStore, RedisStore};
pub use types::*;

use crate::connector::{execute_each, Connector, Execution};
use crate::connectors::get_builtin;
use crate::definition::DefinitionSet;
use crate::error::{Error, Result};
use crate::types::{from_config, from_document, to_document, ConnectionState, Document};
use async_trait::async_trait;
use std::str::FromStr;
use tracing::warn;
use uuid::Uuid;

const VENDOR: &str = "Redis";

const SYSTEM_ROLE: &str = "system";

/// Supported tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    ChatMessageWrite,
    ChatHistoryRetrieve,
}

impl FromStr for Task {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "TASK_CHAT_MESSAGE_WRITE" => Ok(Task::ChatMessageWrite),
            "TASK_CHAT_HISTORY_RETRIEVE" => Ok(Task::ChatHistoryRetrieve),
            other => Err(Error::task_not_supported(other)),
        }
    }
}

/// Persist one message stamped with `timestamp`
pub async fn write_message(
    store: &dyn ChatStore,
    input: ChatMessageWriteInput,
    timestamp: i64,
) -> ChatMessageWriteOutput {
    let is_system = input.message.role == SYSTEM_ROLE;
    let record = TimedMessage {
        message: input.message,
        timestamp,
    };
    let result = match serde_json::to_string(&record) {
        Ok(json) if is_system => store.set_system_message(&input.session_id, json).await,
        Ok(json) => store.add_message(&input.session_id, timestamp, json).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = &result {
        warn!(session = %input.session_id, error = %e, "Failed to write chat message");
    }
    ChatMessageWriteOutput {
        status: result.is_ok(),
    }
}

/// Latest turns of a session in chronological order
///
/// Each turn is two messages, so up to `2 * latest_k` are read.
pub async fn retrieve_messages(
    store: &dyn ChatStore,
    input: &ChatHistoryRetrieveInput,
) -> ChatHistoryRetrieveOutput {
    let mut messages = Vec::new();
    let failed = |messages: Vec<Message>, e: Error| {
        warn!(session = %input.session_id, error = %e, "Failed to read chat history");
        ChatHistoryRetrieveOutput {
            messages,
            status: false,
        }
    };

    let raw = match store
        .latest_messages(&input.session_id, input.latest_k().saturating_mul(2))
        .await
    {
        Ok(raw) => raw,
        Err(e) => return failed(messages, e),
    };

    let mut timed = Vec::with_capacity(raw.len());
    for member in &raw {
        match serde_json::from_str::<TimedMessage>(member) {
            Ok(m) => timed.push(m),
            Err(e) => return failed(messages, e.into()),
        }
    }
    timed.sort_by_key(|m| m.timestamp);

    if input.include_system_message {
        match store.system_message(&input.session_id).await {
            Ok(Some(raw)) => match serde_json::from_str::<TimedMessage>(&raw) {
                Ok(system) => messages.push(system.message),
                Err(e) => return failed(messages, e.into()),
            },
            Ok(None) => {}
            Err(e) => return failed(messages, e),
        }
    }

    messages.extend(timed.into_iter().map(|m| m.message));
    ChatHistoryRetrieveOutput {
        messages,
        status: true,
    }
}

/// Redis connector
pub struct RedisConnector {
    definitions: DefinitionSet,
}

impl RedisConnector {
    /// Load the embedded definitions
    pub fn new() -> Result<Self> {
        Ok(Self {
            definitions: DefinitionSet::from_json("redis", get_builtin("redis")?)?,
        })
    }
}

#[async_trait]
impl Connector for RedisConnector {
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
        Ok(Box::new(RedisExecution {
            task: task.parse()?,
            config: from_config(config)?,
        }))
    }

    async fn test(&self, uid: Uuid, config: &Document) -> Result<ConnectionState> {
        self.definitions.by_uid(&uid)?;
        let config: RedisConfig = from_config(config)?;
        let ping = match RedisStore::connect(&config).await {
            Ok(store) => store.ping().await,
            Err(e) => Err(e),
        };
        match ping {
            Ok(()) => Ok(ConnectionState::Connected),
            Err(e) => {
                warn!(host = %config.host, port = config.port, error = %e, "Redis ping failed");
                Ok(ConnectionState::Disconnected)
            }
        }
    }
}

struct RedisExecution {
    task: Task,
    config: RedisConfig,
}

impl RedisExecution {
    async fn run_one(&self, store: &dyn ChatStore, input: Document) -> Result<Document> {
        match self.task {
            Task::ChatMessageWrite => {
                let input: ChatMessageWriteInput = from_document(&input)?;
                let now = chrono::Utc::now().timestamp();
                to_document(&write_message(store, input, now).await)
            }
            Task::ChatHistoryRetrieve => {
                let input: ChatHistoryRetrieveInput = from_document(&input)?;
                to_document(&retrieve_messages(store, &input).await)
            }
        }
    }
}

#[async_trait]
impl Execution for RedisExecution {
    async fn execute(&self, inputs: Vec<Document>) -> Result<Vec<Document>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let store = RedisStore::connect(&self.config).await?;
        execute_each(inputs, |input| self.run_one(&store, input)).await
    }
}
