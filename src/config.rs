//! Registry options
//!
//! Process-wide settings handed to [`crate::registry::Registry::new`]. Today
//! only the Airbyte connector needs any: where the shared data volume is
//! mounted and which local destinations to hide.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable prefix for Airbyte option overrides
pub const AIRBYTE_ENV_PREFIX: &str = "CONNECTOR_AIRBYTE_";

// ============================================================================
// Top-Level Options
// ============================================================================

/// Options for building a registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryOptions {
    /// Airbyte destination settings
    #[serde(default)]
    pub airbyte: AirbyteOptions,
}

impl RegistryOptions {
    /// Load options from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("failed to read options {}: {e}", path.display()))
        })?;
        Self::from_yaml(&raw)
    }

    /// Parse options from a YAML string
    pub fn from_yaml(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Apply `CONNECTOR_AIRBYTE_*` overrides from the process environment
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(std::env::vars())
    }

    /// Apply overrides from an arbitrary key/value source
    #[must_use]
    pub fn with_overrides<I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(AIRBYTE_ENV_PREFIX) else {
                continue;
            };
            let a = &mut self.airbyte;
            match name.to_ascii_lowercase().as_str() {
                "mount_source_vdp" => a.mount_source_vdp = value,
                "mount_target_vdp" => a.mount_target_vdp = value,
                "mount_source_airbyte" => a.mount_source_airbyte = value,
                "mount_target_airbyte" => a.mount_target_airbyte = value,
                "vdp_protocol_path" => a.vdp_protocol_path = value,
                "exclude_local_connector" => {
                    a.exclude_local_connector = matches!(value.as_str(), "1" | "true" | "TRUE");
                }
                _ => {}
            }
        }
        self
    }
}

// ============================================================================
// Airbyte Options
// ============================================================================

/// Where Airbyte containers find their config and data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirbyteOptions {
    /// Host path or volume name shared with the containers for config files
    #[serde(default = "default_mount_source_vdp")]
    pub mount_source_vdp: String,

    /// Where that share is mounted in this process and in the container
    #[serde(default = "default_mount_target_vdp")]
    pub mount_target_vdp: String,

    /// Host path or volume name for destination output
    #[serde(default = "default_mount_source_airbyte")]
    pub mount_source_airbyte: String,

    /// Where destination output is mounted in the container
    #[serde(default = "default_mount_target_airbyte")]
    pub mount_target_airbyte: String,

    /// JSON schema file describing the records pushed to destinations
    #[serde(default)]
    pub vdp_protocol_path: String,

    /// Hide destinations that only write to the local filesystem
    #[serde(default)]
    pub exclude_local_connector: bool,
}

impl Default for AirbyteOptions {
    fn default() -> Self {
        Self {
            mount_source_vdp: default_mount_source_vdp(),
            mount_target_vdp: default_mount_target_vdp(),
            mount_source_airbyte: default_mount_source_airbyte(),
            mount_target_airbyte: default_mount_target_airbyte(),
            vdp_protocol_path: String::new(),
            exclude_local_connector: false,
        }
    }
}

fn default_mount_source_vdp() -> String {
    "vdp".to_string()
}

fn default_mount_target_vdp() -> String {
    "/vdp".to_string()
}

fn default_mount_source_airbyte() -> String {
    "airbyte".to_string()
}

fn default_mount_target_airbyte() -> String {
    "/local".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let opts = RegistryOptions::default();
        assert_eq!(opts.airbyte.mount_target_vdp, "/vdp");
        assert_eq!(opts.airbyte.mount_target_airbyte, "/local");
        assert!(!opts.airbyte.exclude_local_connector);
    }

    #[test]
    fn test_from_yaml_partial() {
        let opts = RegistryOptions::from_yaml(
            r"
airbyte:
  mount_source_vdp: /srv/vdp
  exclude_local_connector: true
",
        )
        .unwrap();

        assert_eq!(opts.airbyte.mount_source_vdp, "/srv/vdp");
        assert_eq!(opts.airbyte.mount_target_vdp, "/vdp");
        assert!(opts.airbyte.exclude_local_connector);
    }

    #[test]
    fn test_from_yaml_empty() {
        assert_eq!(
            RegistryOptions::from_yaml("").unwrap(),
            RegistryOptions::default()
        );
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "airbyte:\n  vdp_protocol_path: /etc/vdp.json").unwrap();

        let opts = RegistryOptions::from_file(file.path()).unwrap();
        assert_eq!(opts.airbyte.vdp_protocol_path, "/etc/vdp.json");
    }

    #[test]
    fn test_env_overrides() {
        let opts = RegistryOptions::default().with_overrides(vec![
            (
                "CONNECTOR_AIRBYTE_MOUNT_TARGET_VDP".to_string(),
                "/data".to_string(),
            ),
            (
                "CONNECTOR_AIRBYTE_EXCLUDE_LOCAL_CONNECTOR".to_string(),
                "true".to_string(),
            ),
            ("UNRELATED".to_string(), "x".to_string()),
        ]);

        assert_eq!(opts.airbyte.mount_target_vdp, "/data");
        assert!(opts.airbyte.exclude_local_connector);
    }
}
