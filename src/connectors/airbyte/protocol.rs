//! Airbyte protocol messages
//!
//! Only the subset a destination needs: a configured catalog, RECORD
//! messages on stdin and CONNECTION_STATUS messages on stdout.

use crate::error::{Error, Result};
use crate::types::{ConnectionState, DestinationSyncMode, Document, JsonValue, SyncMode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Name of the single stream pushed to every destination
pub const STREAM_NAME: &str = "vdp";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirbyteStream {
    pub name: String,
    pub json_schema: JsonValue,
    pub supported_sync_modes: Vec<SyncMode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfiguredAirbyteStream {
    pub stream: AirbyteStream,
    pub sync_mode: SyncMode,
    pub destination_sync_mode: DestinationSyncMode,
}

/// Catalog handed to `write --catalog`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfiguredAirbyteCatalog {
    pub streams: Vec<ConfiguredAirbyteStream>,
}

impl ConfiguredAirbyteCatalog {
    /// One full-refresh/append stream with the given record schema
    pub fn single_stream(json_schema: JsonValue) -> Self {
        Self {
            streams: vec![ConfiguredAirbyteStream {
                stream: AirbyteStream {
                    name: STREAM_NAME.to_string(),
                    json_schema,
                    supported_sync_modes: vec![SyncMode::FullRefresh],
                },
                sync_mode: SyncMode::FullRefresh,
                destination_sync_mode: DestinationSyncMode::Append,
            }],
        }
    }
}

/// Load the record schema, falling back to an empty object schema
pub fn load_record_schema(path: &str) -> JsonValue {
    let empty = serde_json::json!({"type": "object"});
    if path.is_empty() {
        return empty;
    }
    let raw = match std::fs::read_to_string(Path::new(path)) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path, error = %e, "Could not read record schema, using an empty one");
            return empty;
        }
    };
    // YAML is a superset of JSON, so either format is accepted
    match serde_yaml::from_str::<JsonValue>(&raw) {
        Ok(schema) => schema,
        Err(e) => {
            warn!(path, error = %e, "Could not parse record schema, using an empty one");
            empty
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirbyteRecordMessage {
    pub stream: String,
    pub data: Document,
    pub emitted_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirbyteConnectionStatus {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A line of the Airbyte protocol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirbyteMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<AirbyteRecordMessage>,
    #[serde(
        default,
        rename = "connectionStatus",
        skip_serializing_if = "Option::is_none"
    )]
    pub connection_status: Option<AirbyteConnectionStatus>,
}

impl AirbyteMessage {
    pub fn record(data: Document, emitted_at: i64) -> Self {
        Self {
            kind: "RECORD".to_string(),
            record: Some(AirbyteRecordMessage {
                stream: STREAM_NAME.to_string(),
                data,
                emitted_at,
            }),
            connection_status: None,
        }
    }
}

/// Serialize records as JSON lines, terminated by a newline and EOT
///
/// The destination runs with a TTY attached, so EOT is what closes its
/// stdin.
pub fn encode_records(records: &[AirbyteMessage]) -> Result<Vec<u8>> {
    let mut payload = Vec::new();
    for (i, msg) in records.iter().enumerate() {
        if i > 0 {
            payload.push(b'\n');
        }
        serde_json::to_writer(&mut payload, msg)?;
    }
    payload.extend_from_slice(&[b'\n', 0x04]);
    Ok(payload)
}

/// Find the connection status in the stdout of a `check` run
///
/// Lines that are not protocol messages (logs, TTY noise) are skipped.
pub fn parse_connection_status(stdout: &str) -> Result<ConnectionState> {
    for line in stdout.lines() {
        let Ok(msg) = serde_json::from_str::<AirbyteMessage>(line.trim()) else {
            continue;
        };
        if msg.kind != "CONNECTION_STATUS" {
            continue;
        }
        let Some(status) = msg.connection_status else {
            continue;
        };
        return match status.status.as_str() {
            "SUCCEEDED" => Ok(ConnectionState::Connected),
            "FAILED" => Ok(ConnectionState::Error),
            other => Err(Error::container(format!("UNKNOWN STATUS {other}"))),
        };
    }
    Ok(ConnectionState::Error)
}
