//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::RegistryOptions;
use crate::connector::Connector;
use crate::connectors::airbyte::{AirbyteConnector, DockerRuntime};
use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::types::{Document, JsonValue};
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Definitions { all } => self.definitions(*all),
            Commands::Definition {
                id,
                uid,
                resource_config_json,
                component_config_json,
            } => {
                self.definition(
                    id.as_deref(),
                    uid.as_ref(),
                    resource_config_json.as_deref(),
                    component_config_json.as_deref(),
                )
                .await
            }
            Commands::Check { uid, config_json } => self.check(*uid, config_json.as_deref()).await,
            Commands::Execute {
                uid,
                task,
                config_json,
                inputs_json,
            } => {
                self.execute(*uid, task, config_json.as_deref(), inputs_json)
                    .await
            }
            Commands::PullImages { uids } => self.pull_images(uids).await,
            Commands::Serve { port } => {
                let registry = Arc::new(self.registry()?);
                crate::cli::serve(registry, *port).await
            }
        }
    }

    /// Options file plus `CONNECTOR_AIRBYTE_*` overrides
    fn options(&self) -> Result<RegistryOptions> {
        let options = match &self.cli.options {
            Some(path) => RegistryOptions::from_file(path)?,
            None => RegistryOptions::default(),
        };
        Ok(options.with_env_overrides())
    }

    fn registry(&self) -> Result<Registry> {
        Registry::new(self.options()?)
    }

    fn definitions(&self, all: bool) -> Result<()> {
        let registry = self.registry()?;
        let defs: Vec<JsonValue> = registry
            .definitions(all)
            .into_iter()
            .map(|d| {
                json!({
                    "id": d.id,
                    "uid": d.uid,
                    "title": d.title,
                    "vendor": d.vendor,
                    "tasks": d.tasks,
                    "tombstone": d.tombstone,
                })
            })
            .collect();
        self.output(&JsonValue::Array(defs));
        Ok(())
    }

    async fn definition(
        &self,
        id: Option<&str>,
        uid: Option<&Uuid>,
        resource_config: Option<&str>,
        component_config: Option<&str>,
    ) -> Result<()> {
        let registry = self.registry()?;
        let resource = resource_config.map(parse_document).transpose()?;
        let component = component_config.map(parse_document).transpose()?;

        let def = match (id, uid) {
            (_, Some(uid)) => {
                registry
                    .definition_by_uid(uid, resource.as_ref(), component.as_ref())
                    .await?
            }
            (Some(id), None) => {
                registry
                    .definition_by_id(id, resource.as_ref(), component.as_ref())
                    .await?
            }
            (None, None) => return Err(Error::config("either --id or --uid is required")),
        };
        self.output(&serde_json::to_value(&def)?);
        Ok(())
    }

    async fn check(&self, uid: Uuid, config_json: Option<&str>) -> Result<()> {
        let registry = self.registry()?;
        let config = parse_document(config_json.unwrap_or("{}"))?;

        match registry.test(uid, &config).await {
            Ok(state) => {
                self.output(&json!({"state": state.to_string()}));
                Ok(())
            }
            Err(e) => {
                self.output(&json!({"state": "STATE_ERROR", "message": e.end_user_message()}));
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        uid: Uuid,
        task: &str,
        config_json: Option<&str>,
        inputs_json: &str,
    ) -> Result<()> {
        let registry = self.registry()?;
        let config = parse_document(config_json.unwrap_or("{}"))?;
        let inputs = parse_inputs(inputs_json)?;
        info!(%uid, task, inputs = inputs.len(), "Executing task");

        let execution = registry.create_execution(uid, task, &config)?;
        match execution.execute(inputs).await {
            Ok(outputs) => {
                self.output(&json!({"outputs": outputs}));
                Ok(())
            }
            Err(e) => {
                self.output(&json!({
                    "outputs": e.partial_outputs(),
                    "error": e.end_user_message(),
                }));
                Err(e)
            }
        }
    }

    async fn pull_images(&self, uids: &[Uuid]) -> Result<()> {
        let runtime = Arc::new(DockerRuntime::connect()?);
        let airbyte = AirbyteConnector::new(self.options()?.airbyte, runtime)?;
        let uids: Vec<Uuid> = if uids.is_empty() {
            airbyte.definitions().iter().map(|d| d.uid).collect()
        } else {
            uids.to_vec()
        };
        airbyte.pre_download_images(&uids).await?;
        self.output(&json!({"pulled": uids.len()}));
        Ok(())
    }

    /// Print a JSON value in the selected format
    fn output(&self, value: &JsonValue) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(value).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
            }
        }
    }
}

/// Parse an inline JSON object
pub fn parse_document(raw: &str) -> Result<Document> {
    match serde_json::from_str(raw) {
        Ok(JsonValue::Object(map)) => Ok(map),
        Ok(_) => Err(Error::config("expected a JSON object")),
        Err(e) => Err(Error::config(format!("Invalid JSON: {e}"))),
    }
}

/// Parse a JSON array of objects, or a single object as a batch of one
pub fn parse_inputs(raw: &str) -> Result<Vec<Document>> {
    let value: JsonValue =
        serde_json::from_str(raw).map_err(|e| Error::input(format!("Invalid inputs JSON: {e}")))?;
    match value {
        JsonValue::Object(map) => Ok(vec![map]),
        JsonValue::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                JsonValue::Object(map) => Ok(map),
                _ => Err(Error::input(format!("input {i} is not a JSON object"))),
            })
            .collect(),
        _ => Err(Error::input("inputs must be a JSON object or array")),
    }
}
