//! Error types for the connector registry
//!
//! Every public API returns `Result<T, Error>`. The `Display` form of each
//! variant is the message shown to the end user of a pipeline, so vendor
//! failures are phrased for people configuring a connector rather than for
//! people debugging this crate.

use crate::types::Document;
use thiserror::Error;

/// The main error type for the connector registry
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("{task} task is not supported.")]
    TaskNotSupported { task: String },

    #[error("invalid authentication type")]
    InvalidAuthType,

    #[error("{message}")]
    Auth { message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Definition Errors
    // ============================================================================
    #[error("connector definition {key} not found")]
    UnknownDefinition { key: String },

    #[error("connector definition {key} is registered twice")]
    DuplicateDefinition { key: String },

    #[error("Invalid connector definition in {vendor}: {message}")]
    InvalidDefinition { vendor: String, message: String },

    // ============================================================================
    // Vendor Errors
    // ============================================================================
    #[error("Failed to call {url}. Please check that the connector configuration is correct.")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{vendor} responded with a {status} status code. {message}")]
    VendorStatus {
        vendor: String,
        status: u16,
        message: String,
    },

    #[error("Failed to decode response from {vendor}'s API.")]
    Decode { vendor: String, detail: String },

    #[error("{message}")]
    VendorFailure { message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Input Errors
    // ============================================================================
    #[error("{message}")]
    InvalidInput { message: String },

    // ============================================================================
    // Runtime Errors
    // ============================================================================
    #[error("Container error: {message}")]
    Container { message: String },

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Storage error: {message}")]
    Storage { message: String },

    // ============================================================================
    // Batch Errors
    // ============================================================================
    #[error("{source}")]
    Batch {
        index: usize,
        completed: Vec<Document>,
        source: Box<Error>,
    },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an unsupported task error
    pub fn task_not_supported(task: impl Into<String>) -> Self {
        Self::TaskNotSupported { task: task.into() }
    }

    /// Create an auth strategy error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create an invalid input error
    pub fn input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a vendor status error
    pub fn vendor(vendor: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::VendorStatus {
            vendor: vendor.into(),
            status,
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(vendor: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Decode {
            vendor: vendor.into(),
            detail: detail.into(),
        }
    }

    /// Create an error for a 2xx response that reports a failure in its payload
    pub fn vendor_failure(message: impl Into<String>) -> Self {
        Self::VendorFailure {
            message: message.into(),
        }
    }

    /// Create a container runtime error
    pub fn container(message: impl Into<String>) -> Self {
        Self::Container {
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create an unknown definition error
    pub fn unknown_definition(key: impl std::fmt::Display) -> Self {
        Self::UnknownDefinition {
            key: key.to_string(),
        }
    }

    /// Wrap an error raised while processing input `index` of a batch
    pub fn batch(index: usize, completed: Vec<Document>, source: Error) -> Self {
        Self::Batch {
            index,
            completed,
            source: Box::new(source),
        }
    }

    /// Message meant for the end user, without internal prefixes
    pub fn end_user_message(&self) -> String {
        match self {
            Error::Config { message } => message.clone(),
            Error::Batch { source, .. } => source.end_user_message(),
            other => other.to_string(),
        }
    }

    /// Outputs produced before a batch failed
    pub fn partial_outputs(&self) -> &[Document] {
        match self {
            Error::Batch { completed, .. } => completed,
            _ => &[],
        }
    }

    /// Index of the input that made a batch fail
    pub fn failed_index(&self) -> Option<usize> {
        match self {
            Error::Batch { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Innermost error, looking through batch wrappers
    pub fn root(&self) -> &Error {
        match self {
            Error::Batch { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Result type alias for the connector registry
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");
        assert_eq!(err.end_user_message(), "test message");

        let err = Error::task_not_supported("TASK_FOO");
        assert_eq!(err.to_string(), "TASK_FOO task is not supported.");

        let err = Error::vendor("Archetype AI", 401, "Invalid access.");
        assert_eq!(
            err.to_string(),
            "Archetype AI responded with a 401 status code. Invalid access."
        );

        let err = Error::decode("OpenAI", "expected value at line 1");
        assert_eq!(
            err.to_string(),
            "Failed to decode response from OpenAI's API."
        );

        assert_eq!(
            Error::InvalidAuthType.to_string(),
            "invalid authentication type"
        );
    }

    #[test]
    fn test_batch_error_is_transparent() {
        let mut done = Document::new();
        done.insert("a".to_string(), json!(1));

        let err = Error::batch(1, vec![done], Error::vendor("Pinecone", 400, "bad"));
        assert_eq!(
            err.to_string(),
            "Pinecone responded with a 400 status code. bad"
        );
        assert_eq!(err.partial_outputs().len(), 1);
        assert_eq!(err.failed_index(), Some(1));
        assert!(matches!(err.root(), Error::VendorStatus { status: 400, .. }));
    }

    #[test]
    fn test_partial_outputs_empty_for_plain_errors() {
        let err = Error::input("missing field");
        assert!(err.partial_outputs().is_empty());
        assert_eq!(err.failed_index(), None);
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(Error::config("inner"));
        let with_context = result.context("outer");
        assert!(with_context
            .unwrap_err()
            .to_string()
            .contains("outer: Configuration error: inner"));
    }
}
