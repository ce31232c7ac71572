//! Airbyte destination connector
//!
//! Each definition is an Airbyte destination image. Writing a batch runs
//! the image once with `write`, streaming the inputs as RECORD messages on
//! stdin. Config and catalog are handed over as files on a volume that is
//! mounted both here and in the container.

mod cache;
mod protocol;
mod runtime;

pub use cache::*;
pub use protocol::*;
pub use runtime::*;

use crate::config::AirbyteOptions;
use crate::connector::{Connector, Execution};
use crate::connectors::get_builtin;
use crate::definition::{ConnectorDefinition, DefinitionSet};
use crate::error::{Error, Result};
use crate::types::{ConnectionState, Document, JsonValue};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

const VENDOR: &str = "Airbyte";

/// Destinations that only write inside the container's local mount
pub const LOCAL_DESTINATIONS: [&str; 4] = [
    "airbyte-destination-local-json",
    "airbyte-destination-csv",
    "airbyte-destination-sqlite",
    "airbyte-destination-duckdb",
];

/// Supported tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    WriteDestination,
}

impl FromStr for Task {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "TASK_WRITE_DESTINATION" => Ok(Task::WriteDestination),
            other => Err(Error::task_not_supported(other)),
        }
    }
}

/// Container image of a destination definition
fn image_of(def: &ConnectorDefinition) -> Result<String> {
    match (
        def.vendor_attribute("dockerRepository"),
        def.vendor_attribute("dockerImageTag"),
    ) {
        (Some(repo), Some(tag)) => Ok(format!("{repo}:{tag}")),
        _ => Err(Error::InvalidDefinition {
            vendor: VENDOR.to_string(),
            message: format!("{} has no docker image", def.id),
        }),
    }
}

fn run_name(uid: &Uuid, command: &str) -> String {
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("{uid}.{nanos}.{command}")
}

/// Config and catalog files shared with a container
///
/// The files are removed when the guard is dropped, whatever the outcome
/// of the run.
struct LocalFiles {
    paths: Vec<PathBuf>,
}

impl LocalFiles {
    fn new() -> Self {
        Self { paths: Vec::new() }
    }

    fn write(&mut self, path: PathBuf, value: &JsonValue) -> Result<String> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(&path, serde_json::to_vec(value)?)?;
        let display = path.to_string_lossy().into_owned();
        self.paths.push(path);
        Ok(display)
    }
}

impl Drop for LocalFiles {
    fn drop(&mut self) {
        for path in &self.paths {
            if let Err(e) = std::fs::remove_file(path) {
                warn!(path = %path.display(), error = %e, "Failed to remove local file");
            }
        }
    }
}

/// Paths and mounts derived from [`AirbyteOptions`]
#[derive(Debug, Clone)]
struct Layout {
    options: AirbyteOptions,
}

impl Layout {
    fn data_dir(&self) -> PathBuf {
        Path::new(&self.options.mount_target_vdp).join("connector-data")
    }

    fn config_path(&self, name: &str) -> PathBuf {
        self.data_dir().join("config").join(format!("{name}.json"))
    }

    fn catalog_path(&self, name: &str) -> PathBuf {
        self.data_dir().join("catalog").join(format!("{name}.json"))
    }

    fn vdp_mount(&self) -> MountSpec {
        MountSpec::new(
            &self.options.mount_source_vdp,
            &self.options.mount_target_vdp,
        )
    }

    fn airbyte_mount(&self) -> MountSpec {
        MountSpec::new(
            &self.options.mount_source_airbyte,
            &self.options.mount_target_airbyte,
        )
    }
}

/// Airbyte destinations connector
pub struct AirbyteConnector {
    definitions: DefinitionSet,
    layout: Layout,
    runtime: Arc<dyn ContainerRuntime>,
    cache: Arc<RunCache>,
}

impl AirbyteConnector {
    /// Load the embedded definitions, hiding local destinations if asked
    pub fn new(options: AirbyteOptions, runtime: Arc<dyn ContainerRuntime>) -> Result<Self> {
        let mut definitions = DefinitionSet::from_json("airbyte", get_builtin("airbyte")?)?;

        if options.exclude_local_connector {
            for id in LOCAL_DESTINATIONS {
                if definitions.tombstone(id) {
                    debug!(id, "Excluded local destination");
                }
            }
        }

        Ok(Self {
            definitions,
            layout: Layout { options },
            runtime,
            cache: Arc::new(RunCache::default()),
        })
    }

    /// Pull the images of the given definitions ahead of the first run
    pub async fn pre_download_images(&self, uids: &[Uuid]) -> Result<()> {
        for uid in uids {
            let image = image_of(self.definitions.by_uid(uid)?)?;
            info!(image = %image, "Pre-downloading destination image");
            self.runtime.pull_image(&image).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Connector for AirbyteConnector {
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
        let def = self.definitions.by_uid(&uid)?;
        let _task: Task = task.parse()?;
        Ok(Box::new(AirbyteExecution {
            uid,
            image: image_of(def)?,
            config: config.clone(),
            layout: self.layout.clone(),
            runtime: Arc::clone(&self.runtime),
            cache: Arc::clone(&self.cache),
        }))
    }

    async fn test(&self, uid: Uuid, config: &Document) -> Result<ConnectionState> {
        let image = image_of(self.definitions.by_uid(&uid)?)?;
        self.runtime.pull_image(&image).await?;

        let name = run_name(&uid, "check");
        let mut files = LocalFiles::new();
        let config_path = files.write(
            self.layout.config_path(&name),
            &JsonValue::Object(config.clone()),
        )?;

        let spec = ContainerSpec {
            name,
            image,
            cmd: vec!["check".into(), "--config".into(), config_path],
            mounts: vec![self.layout.vdp_mount()],
        };
        let stdout = self.runtime.run_to_completion(&spec).await?;
        parse_connection_status(&stdout)
    }
}

struct AirbyteExecution {
    uid: Uuid,
    image: String,
    config: Document,
    layout: Layout,
    runtime: Arc<dyn ContainerRuntime>,
    cache: Arc<RunCache>,
}

impl AirbyteExecution {
    async fn write(&self, name: &str, payload: Vec<u8>) -> Result<()> {
        self.runtime.pull_image(&self.image).await?;

        let catalog = ConfiguredAirbyteCatalog::single_stream(load_record_schema(
            &self.layout.options.vdp_protocol_path,
        ));

        let mut files = LocalFiles::new();
        let config_path = files.write(
            self.layout.config_path(name),
            &JsonValue::Object(self.config.clone()),
        )?;
        let catalog_path =
            files.write(self.layout.catalog_path(name), &serde_json::to_value(&catalog)?)?;

        let spec = ContainerSpec {
            name: name.to_string(),
            image: self.image.clone(),
            cmd: vec![
                "write".into(),
                "--config".into(),
                config_path,
                "--catalog".into(),
                catalog_path,
            ],
            mounts: vec![self.layout.vdp_mount(), self.layout.airbyte_mount()],
        };

        let output = self.runtime.run_with_stdin(&spec, payload).await?;
        debug!(container = %name, output = %output.trim(), "Destination finished");
        Ok(())
    }
}

#[async_trait]
impl Execution for AirbyteExecution {
    async fn execute(&self, inputs: Vec<Document>) -> Result<Vec<Document>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let emitted_at = chrono::Utc::now().timestamp_millis();
        let records: Vec<AirbyteMessage> = inputs
            .iter()
            .map(|input| {
                let data = input
                    .get("data")
                    .and_then(JsonValue::as_object)
                    .cloned()
                    .unwrap_or_default();
                AirbyteMessage::record(data, emitted_at)
            })
            .collect();
        let outputs = vec![Document::new(); inputs.len()];

        let name = run_name(&self.uid, "write");
        if self.cache.contains(&name) {
            info!(container = %name, "Run already dispatched");
            return Ok(outputs);
        }

        let payload = encode_records(&records)?;
        self.write(&name, payload)
            .await
            .map_err(|e| Error::batch(0, Vec::new(), e))?;

        self.cache.insert(name.clone());
        self.cache.remove(&name);
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests;
