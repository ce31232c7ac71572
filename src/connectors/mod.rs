//! Built-in vendor connectors
//!
//! Each submodule implements [`crate::connector::Connector`] for one vendor.
//! Their definitions are embedded JSON files compiled into the binary.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::LazyLock;

pub mod airbyte;
pub mod archetypeai;
pub mod gcs;
pub mod googlesearch;
pub mod huggingface;
pub mod instill;
pub mod numbers;
pub mod openai;
pub mod pinecone;
pub mod redis;
pub mod restapi;
pub mod stabilityai;

/// Built-in definition files keyed by vendor module name
pub static BUILTIN_DEFINITIONS: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| {
        let mut m = HashMap::new();

        // Model providers
        m.insert("openai", include_str!("../../definitions/openai.json"));
        m.insert(
            "huggingface",
            include_str!("../../definitions/huggingface.json"),
        );
        m.insert(
            "stabilityai",
            include_str!("../../definitions/stabilityai.json"),
        );
        m.insert("instill", include_str!("../../definitions/instill.json"));
        m.insert(
            "archetypeai",
            include_str!("../../definitions/archetypeai.json"),
        );

        // Data stores
        m.insert("pinecone", include_str!("../../definitions/pinecone.json"));
        m.insert("redis", include_str!("../../definitions/redis.json"));
        m.insert("gcs", include_str!("../../definitions/gcs.json"));
        m.insert("airbyte", include_str!("../../definitions/airbyte.json"));

        // Generic and web
        m.insert("restapi", include_str!("../../definitions/restapi.json"));
        m.insert(
            "googlesearch",
            include_str!("../../definitions/googlesearch.json"),
        );
        m.insert("numbers", include_str!("../../definitions/numbers.json"));

        m
    });

/// Get the embedded definitions for a vendor
pub fn get_builtin(name: &str) -> Result<&'static str> {
    BUILTIN_DEFINITIONS
        .get(name)
        .copied()
        .ok_or_else(|| Error::config(format!("no built-in definitions for {name}")))
}

/// List vendor module names with embedded definitions
pub fn list_builtin() -> Vec<&'static str> {
    let mut names: Vec<_> = BUILTIN_DEFINITIONS.keys().copied().collect();
    names.sort_unstable();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::DefinitionSet;
    use std::collections::HashSet;

    #[test]
    fn test_every_builtin_parses() {
        for name in list_builtin() {
            let raw = get_builtin(name).unwrap();
            let set = DefinitionSet::from_json(name, raw)
                .unwrap_or_else(|e| panic!("{name}: {e}"));
            assert!(!set.is_empty(), "{name} has no definitions");
        }
    }

    #[test]
    fn test_builtin_ids_and_uids_are_unique() {
        let mut ids = HashSet::new();
        let mut uids = HashSet::new();
        for name in list_builtin() {
            let set = DefinitionSet::from_json(name, get_builtin(name).unwrap()).unwrap();
            for def in set.iter() {
                assert!(ids.insert(def.id.clone()), "duplicate id {}", def.id);
                assert!(uids.insert(def.uid), "duplicate uid {}", def.uid);
            }
        }
    }

    #[test]
    fn test_unknown_builtin() {
        assert!(get_builtin("nope").is_err());
    }
}
