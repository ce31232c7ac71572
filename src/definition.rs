//! Connector definitions
//!
//! A definition is the static metadata a pipeline backend shows for a
//! connector: identity, supported tasks and the JSON schemas that describe
//! resource configuration, component configuration and task I/O. They are
//! compiled into the binary as JSON arrays and parsed once at startup.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Schemas attached to a definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefinitionSpec {
    /// Schema of the resource (connection) configuration
    #[serde(default)]
    pub resource_specification: Value,

    /// Schema of the component configuration, usually a `oneOf` per task
    #[serde(default)]
    pub component_specification: Value,

    /// OpenAPI documents keyed by task name
    #[serde(default)]
    pub openapi_specifications: Value,
}

/// Metadata describing one connector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorDefinition {
    /// Human-readable unique identifier
    pub id: String,

    /// Stable unique identifier
    pub uid: Uuid,

    /// Display title
    pub title: String,

    /// Vendor display name
    #[serde(default)]
    pub vendor: String,

    /// Short description
    #[serde(default)]
    pub description: String,

    /// Link to end-user documentation
    #[serde(default)]
    pub documentation_url: String,

    /// Supported task names
    #[serde(default)]
    pub tasks: Vec<String>,

    /// Vendor-specific attributes (e.g. container image for Airbyte)
    #[serde(default)]
    pub vendor_attributes: Value,

    /// Attached schemas
    #[serde(default)]
    pub spec: DefinitionSpec,

    /// Retired definitions stay resolvable but are hidden from listings
    #[serde(default)]
    pub tombstone: bool,

    /// Whether the definition is shown publicly
    #[serde(default = "default_true")]
    pub public: bool,
}

fn default_true() -> bool {
    true
}

impl ConnectorDefinition {
    /// Whether this definition declares `task`
    pub fn supports_task(&self, task: &str) -> bool {
        self.tasks.iter().any(|t| t == task)
    }

    /// String attribute from `vendor_attributes`
    pub fn vendor_attribute(&self, key: &str) -> Option<&str> {
        self.vendor_attributes.get(key).and_then(Value::as_str)
    }
}

/// The definitions owned by one vendor connector
#[derive(Debug, Clone, Default)]
pub struct DefinitionSet {
    definitions: Vec<ConnectorDefinition>,
}

impl DefinitionSet {
    /// Parse an embedded JSON array of definitions
    pub fn from_json(vendor: &str, raw: &str) -> Result<Self> {
        let definitions: Vec<ConnectorDefinition> =
            serde_json::from_str(raw).map_err(|e| Error::InvalidDefinition {
                vendor: vendor.to_string(),
                message: e.to_string(),
            })?;

        if definitions.is_empty() {
            return Err(Error::InvalidDefinition {
                vendor: vendor.to_string(),
                message: "no definitions found".to_string(),
            });
        }

        Ok(Self { definitions })
    }

    /// Look up a definition by UID
    pub fn by_uid(&self, uid: &Uuid) -> Result<&ConnectorDefinition> {
        self.definitions
            .iter()
            .find(|d| d.uid == *uid)
            .ok_or_else(|| Error::unknown_definition(uid))
    }

    /// Look up a definition by ID
    pub fn by_id(&self, id: &str) -> Result<&ConnectorDefinition> {
        self.definitions
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| Error::unknown_definition(id))
    }

    /// Iterate over all definitions
    pub fn iter(&self) -> impl Iterator<Item = &ConnectorDefinition> {
        self.definitions.iter()
    }

    /// Number of definitions
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Mark the definition with `id` as retired. Returns whether it was found.
    pub fn tombstone(&mut self, id: &str) -> bool {
        match self.definitions.iter_mut().find(|d| d.id == id) {
            Some(def) => {
                def.tombstone = true;
                true
            }
            None => false,
        }
    }
}
