//! Connector registry
//!
//! The registry owns one instance of every vendor connector and routes
//! requests to the connector that owns a definition. It is built once at
//! startup and then shared read-only (usually behind an `Arc`).

use crate::config::RegistryOptions;
use crate::connector::{Connector, Execution};
use crate::connectors::{
    airbyte::{AirbyteConnector, ContainerRuntime, DockerRuntime},
    archetypeai::ArchetypeAiConnector,
    gcs::GcsConnector,
    googlesearch::GoogleSearchConnector,
    huggingface::HuggingFaceConnector,
    instill::InstillConnector,
    numbers::NumbersConnector,
    openai::OpenAiConnector,
    pinecone::PineconeConnector,
    redis::RedisConnector,
    restapi::RestApiConnector,
    stabilityai::StabilityAiConnector,
};
use crate::definition::ConnectorDefinition;
use crate::error::{Error, Result};
use crate::types::{ConnectionState, Document};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Routes connector operations by definition UID or ID
#[derive(Default)]
pub struct Registry {
    connectors: Vec<Arc<dyn Connector>>,
    by_uid: HashMap<Uuid, Arc<dyn Connector>>,
    by_id: HashMap<String, Arc<dyn Connector>>,
}

impl Registry {
    /// Build a registry with every built-in vendor connector
    pub fn new(options: RegistryOptions) -> Result<Self> {
        let runtime: Arc<dyn ContainerRuntime> = Arc::new(DockerRuntime::connect()?);
        Self::with_container_runtime(options, runtime)
    }

    /// Build a registry whose Airbyte connector uses the given container runtime
    pub fn with_container_runtime(
        options: RegistryOptions,
        runtime: Arc<dyn ContainerRuntime>,
    ) -> Result<Self> {
        let mut registry = Self::empty();

        registry.import_definitions(Arc::new(StabilityAiConnector::new()?))?;
        registry.import_definitions(Arc::new(InstillConnector::new()?))?;
        registry.import_definitions(Arc::new(HuggingFaceConnector::new()?))?;
        registry.import_definitions(Arc::new(OpenAiConnector::new()?))?;
        registry.import_definitions(Arc::new(NumbersConnector::new()?))?;
        registry.import_definitions(Arc::new(AirbyteConnector::new(
            options.airbyte,
            runtime,
        )?))?;
        registry.import_definitions(Arc::new(GcsConnector::new()?))?;
        registry.import_definitions(Arc::new(GoogleSearchConnector::new()?))?;
        registry.import_definitions(Arc::new(PineconeConnector::new()?))?;
        registry.import_definitions(Arc::new(RedisConnector::new()?))?;
        registry.import_definitions(Arc::new(RestApiConnector::new()?))?;
        registry.import_definitions(Arc::new(ArchetypeAiConnector::new()?))?;

        info!(
            connectors = registry.connectors.len(),
            definitions = registry.by_uid.len(),
            "Connector registry initialized"
        );

        Ok(registry)
    }

    /// A registry with no connectors
    pub fn empty() -> Self {
        Self::default()
    }

    /// Register every definition owned by `connector`
    ///
    /// Fails without registering anything if one of its UIDs or IDs is
    /// already taken.
    pub fn import_definitions(&mut self, connector: Arc<dyn Connector>) -> Result<()> {
        for def in connector.definitions().iter() {
            if self.by_uid.contains_key(&def.uid) {
                return Err(Error::DuplicateDefinition {
                    key: def.uid.to_string(),
                });
            }
            if self.by_id.contains_key(&def.id) {
                return Err(Error::DuplicateDefinition {
                    key: def.id.clone(),
                });
            }
        }

        for def in connector.definitions().iter() {
            debug!(vendor = connector.vendor(), id = %def.id, "Registering definition");
            self.by_uid.insert(def.uid, Arc::clone(&connector));
            self.by_id.insert(def.id.clone(), Arc::clone(&connector));
        }
        self.connectors.push(connector);
        Ok(())
    }

    fn owner_by_uid(&self, uid: &Uuid) -> Result<&Arc<dyn Connector>> {
        self.by_uid
            .get(uid)
            .ok_or_else(|| Error::unknown_definition(uid))
    }

    fn owner_by_id(&self, id: &str) -> Result<&Arc<dyn Connector>> {
        self.by_id.get(id).ok_or_else(|| Error::unknown_definition(id))
    }

    /// Create an execution for `task` on the definition `uid`
    pub fn create_execution(
        &self,
        uid: Uuid,
        task: &str,
        config: &Document,
    ) -> Result<Box<dyn Execution>> {
        self.owner_by_uid(&uid)?.create_execution(uid, task, config)
    }

    /// Test a configuration against the definition `uid`
    pub async fn test(&self, uid: Uuid, config: &Document) -> Result<ConnectionState> {
        self.owner_by_uid(&uid)?.test(uid, config).await
    }

    /// Definition by UID, possibly enriched from the given configs
    pub async fn definition_by_uid(
        &self,
        uid: &Uuid,
        resource_config: Option<&Document>,
        component_config: Option<&Document>,
    ) -> Result<ConnectorDefinition> {
        self.owner_by_uid(uid)?
            .definition_by_uid(uid, resource_config, component_config)
            .await
    }

    /// Definition by ID, possibly enriched from the given configs
    pub async fn definition_by_id(
        &self,
        id: &str,
        resource_config: Option<&Document>,
        component_config: Option<&Document>,
    ) -> Result<ConnectorDefinition> {
        self.owner_by_id(id)?
            .definition_by_id(id, resource_config, component_config)
            .await
    }

    /// All registered definitions, in registration order
    pub fn definitions(&self, include_tombstoned: bool) -> Vec<&ConnectorDefinition> {
        self.connectors
            .iter()
            .flat_map(|c| c.definitions().iter())
            .filter(|d| include_tombstoned || !d.tombstone)
            .collect()
    }

    /// Whether a definition UID is registered
    pub fn contains(&self, uid: &Uuid) -> bool {
        self.by_uid.contains_key(uid)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("connectors", &self.connectors.len())
            .field("definitions", &self.by_uid.len())
            .finish_non_exhaustive()
    }
}
