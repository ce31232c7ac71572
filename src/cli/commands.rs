//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

/// Run vendor connectors from the command line
#[derive(Parser, Debug)]
#[command(name = "vdp-connector")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Registry options file (YAML)
    #[arg(short, long, global = true)]
    pub options: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List connector definitions
    Definitions {
        /// Include retired definitions
        #[arg(long)]
        all: bool,
    },

    /// Show one connector definition
    Definition {
        /// Definition ID
        #[arg(long, conflicts_with = "uid", required_unless_present = "uid")]
        id: Option<String>,

        /// Definition UID
        #[arg(long)]
        uid: Option<Uuid>,

        /// Resource config JSON used to enrich the definition
        #[arg(long)]
        resource_config_json: Option<String>,

        /// Component config JSON used to enrich the definition
        #[arg(long)]
        component_config_json: Option<String>,
    },

    /// Test a connector configuration
    Check {
        /// Definition UID
        #[arg(long)]
        uid: Uuid,

        /// Inline config JSON
        #[arg(long)]
        config_json: Option<String>,
    },

    /// Run a task over a batch of inputs
    Execute {
        /// Definition UID
        #[arg(long)]
        uid: Uuid,

        /// Task name, e.g. TASK_TEXT_GENERATION
        #[arg(long)]
        task: String,

        /// Inline config JSON
        #[arg(long)]
        config_json: Option<String>,

        /// Inputs as a JSON array of objects (or a single object)
        #[arg(long)]
        inputs_json: String,
    },

    /// Pull Airbyte destination images ahead of time
    PullImages {
        /// Definition UIDs (all Airbyte destinations when empty)
        #[arg(long = "uid")]
        uids: Vec<Uuid>,
    },

    /// Start HTTP server mode
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Compact JSON
    Json,
    /// Indented JSON
    Pretty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_execute() {
        let cli = Cli::try_parse_from([
            "vdp-connector",
            "execute",
            "--uid",
            "9fb74a18-cc9e-4493-9e41-7d2d5e7b1c27",
            "--task",
            "TASK_TEXT_GENERATION",
            "--inputs-json",
            "[]",
            "--format",
            "pretty",
        ])
        .unwrap();

        assert_eq!(cli.format, OutputFormat::Pretty);
        match cli.command {
            Commands::Execute { task, config_json, .. } => {
                assert_eq!(task, "TASK_TEXT_GENERATION");
                assert!(config_json.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_definition_needs_id_or_uid() {
        assert!(Cli::try_parse_from(["vdp-connector", "definition"]).is_err());
        assert!(Cli::try_parse_from(["vdp-connector", "definition", "--id", "openai"]).is_ok());
    }

    #[test]
    fn test_pull_images_repeats_uid() {
        let cli = Cli::try_parse_from([
            "vdp-connector",
            "pull-images",
            "--uid",
            "975678a2-5117-48a4-a135-019619dee18e",
            "--uid",
            "25c2fa4e-0b1f-4b44-8d3a-6e5f9c2b7a81",
        ])
        .unwrap();
        match cli.command {
            Commands::PullImages { uids } => assert_eq!(uids.len(), 2),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
