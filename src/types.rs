//! Common types used throughout the connector registry
//!
//! This module contains the document envelope every connector speaks,
//! the connection-test outcome and a few encoding helpers shared by
//! vendors that move binary payloads around.

use crate::error::{Error, Result};
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// Untyped structured document used for configs, inputs and outputs
pub type Document = serde_json::Map<String, JsonValue>;

// ============================================================================
// Connection State
// ============================================================================

/// Outcome of a connection test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    /// Credentials and endpoint work
    Connected,
    /// Endpoint reachable but not usable
    Disconnected,
    /// Test failed
    Error,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConnectionState::Connected => "STATE_CONNECTED",
            ConnectionState::Disconnected => "STATE_DISCONNECTED",
            ConnectionState::Error => "STATE_ERROR",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Sync Mode
// ============================================================================

/// Synchronization mode for a configured stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Full refresh - push everything every time
    #[default]
    FullRefresh,
    /// Incremental - only push new records
    Incremental,
}

/// How records should be written to a destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationSyncMode {
    /// Append new records
    #[default]
    Append,
    /// Overwrite existing data
    Overwrite,
    /// Append and deduplicate on primary key
    AppendDedup,
}

// ============================================================================
// Document conversion
// ============================================================================

/// Decode a document into a typed struct
///
/// Missing or mistyped fields surface as an input error naming the field.
pub fn from_document<T: DeserializeOwned>(doc: &Document) -> Result<T> {
    serde_json::from_value(JsonValue::Object(doc.clone()))
        .map_err(|e| Error::input(format!("invalid input: {e}")))
}

/// Decode a connector configuration into a typed struct
pub fn from_config<T: DeserializeOwned>(doc: &Document) -> Result<T> {
    serde_json::from_value(JsonValue::Object(doc.clone()))
        .map_err(|e| Error::config(format!("invalid connector configuration: {e}")))
}

/// Encode a typed struct into a document
pub fn to_document<T: Serialize>(value: &T) -> Result<Document> {
    match serde_json::to_value(value)? {
        JsonValue::Object(map) => Ok(map),
        other => Err(Error::Other(format!(
            "expected an object, got {}",
            kind_of(&other)
        ))),
    }
}

fn kind_of(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

// ============================================================================
// Binary payload helpers
// ============================================================================

/// Strip a `data:<mime>;base64,` prefix if present
pub fn trim_base64_mime(s: &str) -> &str {
    match s.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => s,
    }
}

/// Decode a base64 payload, accepting data URLs
pub fn decode_base64(s: &str) -> Result<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(trim_base64_mime(s))
        .map_err(|e| Error::input(format!("invalid base64 payload: {e}")))
}

/// Encode bytes as standard base64
pub fn encode_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Guess a MIME type from magic bytes
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'A', b'V', b'E', ..] => "audio/wav",
        [b'I', b'D', b'3', ..] | [0xFF, 0xFB, ..] => "audio/mpeg",
        [b'O', b'g', b'g', b'S', ..] => "audio/ogg",
        [b'f', b'L', b'a', b'C', ..] => "audio/flac",
        _ => "application/octet-stream",
    }
}

/// Build a data URL for a base64 payload
pub fn data_url(mime: &str, b64: &str) -> String {
    format!("data:{mime};base64,{b64}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case("data:image/png;base64,AAAA", "AAAA" ; "png data url")]
    #[test_case("AAAA", "AAAA" ; "raw base64")]
    #[test_case("data:audio/wav;base64,", "" ; "empty payload")]
    fn test_trim_base64_mime(input: &str, want: &str) {
        assert_eq!(trim_base64_mime(input), want);
    }

    #[test_case(&[0x89, b'P', b'N', b'G', 0x0D], "image/png" ; "png")]
    #[test_case(&[0xFF, 0xD8, 0xFF, 0xE0], "image/jpeg" ; "jpeg")]
    #[test_case(b"RIFF\0\0\0\0WEBPVP8", "image/webp" ; "webp")]
    #[test_case(b"RIFF\0\0\0\0WAVEfmt", "audio/wav" ; "wav")]
    #[test_case(b"hello", "application/octet-stream" ; "unknown")]
    fn test_sniff_mime(bytes: &[u8], want: &str) {
        assert_eq!(sniff_mime(bytes), want);
    }

    #[test]
    fn test_decode_base64_accepts_data_url() {
        let bytes = decode_base64("data:text/plain;base64,aGk=").unwrap();
        assert_eq!(bytes, b"hi");
        assert!(decode_base64("***").is_err());
    }

    #[test]
    fn test_document_round_trip() {
        #[derive(Serialize, Deserialize, Debug, PartialEq)]
        struct Out {
            status: bool,
        }

        let doc = to_document(&Out { status: true }).unwrap();
        assert_eq!(doc.get("status"), Some(&json!(true)));
        let back: Out = from_document(&doc).unwrap();
        assert_eq!(back, Out { status: true });
    }

    #[test]
    fn test_to_document_rejects_scalars() {
        assert!(to_document(&1).is_err());
    }

    #[test_case(SyncMode::FullRefresh, "full_refresh" ; "full refresh")]
    #[test_case(SyncMode::Incremental, "incremental" ; "incremental")]
    fn test_sync_mode_wire_names(mode: SyncMode, wire: &str) {
        assert_eq!(serde_json::to_value(mode).unwrap(), json!(wire));
        assert_eq!(serde_json::from_value::<SyncMode>(json!(wire)).unwrap(), mode);
    }

    #[test_case(DestinationSyncMode::Append, "append" ; "append")]
    #[test_case(DestinationSyncMode::Overwrite, "overwrite" ; "overwrite")]
    #[test_case(DestinationSyncMode::AppendDedup, "append_dedup" ; "append dedup")]
    fn test_destination_sync_mode_wire_names(mode: DestinationSyncMode, wire: &str) {
        assert_eq!(serde_json::to_value(mode).unwrap(), json!(wire));
        assert_eq!(
            serde_json::from_value::<DestinationSyncMode>(json!(wire)).unwrap(),
            mode
        );
    }

    #[test]
    fn test_connection_state_serde() {
        assert_eq!(
            serde_json::to_value(ConnectionState::Disconnected).unwrap(),
            json!("DISCONNECTED")
        );
        assert_eq!(ConnectionState::Connected.to_string(), "STATE_CONNECTED");
    }
}
