// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # VDP Connector
//!
//! A registry of AI-model and data vendor connectors behind one execution
//! interface. Each vendor ships a set of connector definitions; a pipeline
//! picks a definition by UID, binds a task and a configuration, and runs
//! batches of JSON inputs through it.
//!
//! ## Vendors
//!
//! - **AI models**: OpenAI, HuggingFace, Stability AI, Instill Model, Archetype AI
//! - **Data**: Pinecone, Redis, Google Cloud Storage, Airbyte destinations
//! - **Utilities**: REST API, Google Search, Numbers Protocol
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use vdp_connector::{Registry, RegistryOptions, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let registry = Registry::new(RegistryOptions::default())?;
//!
//!     let def = registry.definition_by_id("openai", None, None).await?;
//!     let config = serde_json::json!({ "api_key": "sk-..." });
//!     let config = config.as_object().cloned().unwrap_or_default();
//!
//!     let state = registry.test(def.uid, &config).await?;
//!     let execution = registry.create_execution(def.uid, "TASK_TEXT_GENERATION", &config)?;
//!     let outputs = execution.execute(vec![/* inputs */]).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           Registry                              │
//! │  create_execution(uid, task, config)   test(uid, config)        │
//! │  definition_by_uid / definition_by_id (+ enrichment)            │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────┬───────────┬───────┴───────┬───────────┬─────────────┐
//! │  Models  │  Vectors  │  Containers   │  Storage  │  Utilities  │
//! ├──────────┼───────────┼───────────────┼───────────┼─────────────┤
//! │ OpenAI   │ Pinecone  │ Airbyte       │ GCS       │ REST API    │
//! │ HF       │ Redis     │ (Docker)      │           │ Search      │
//! │ Stability│           │               │           │ Numbers     │
//! │ Instill  │           │               │           │             │
//! │ Archetype│           │               │           │             │
//! └──────────┴───────────┴───────────────┴───────────┴─────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the connector registry
pub mod error;

/// Common types and type aliases
pub mod types;

/// Authentication for the REST API connector
pub mod auth;

/// HTTP client shared by the vendor connectors
pub mod http;

/// Connector definitions
pub mod definition;

/// Connector and execution traits
pub mod connector;

/// Definition routing
pub mod registry;

/// Registry options
pub mod config;

/// Built-in vendor connectors
pub mod connectors;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

pub use config::{AirbyteOptions, RegistryOptions};
pub use connector::{Connector, Execution};
pub use definition::{ConnectorDefinition, DefinitionSet};
pub use registry::Registry;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
