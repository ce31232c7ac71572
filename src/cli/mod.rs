//! CLI module
//!
//! Command-line interface over the connector registry.
//!
//! # Commands
//!
//! - `definitions` - List connector definitions
//! - `definition` - Show one definition, optionally enriched from configs
//! - `check` - Test a connector configuration
//! - `execute` - Run a task over a batch of inputs
//! - `pull-images` - Pull Airbyte destination images
//! - `serve` - Start HTTP server mode

mod commands;
mod runner;
mod server;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::{parse_document, parse_inputs, Runner};
pub use server::{router, serve};
