//! Connector and execution traits
//!
//! Every vendor implements [`Connector`], which owns a set of definitions
//! and hands out short-lived [`Execution`]s bound to one task and one
//! configuration. The registry only ever talks to these two traits.

use crate::definition::{ConnectorDefinition, DefinitionSet};
use crate::error::{Error, Result};
use crate::types::{ConnectionState, Document};
use async_trait::async_trait;
use std::future::Future;
use uuid::Uuid;

// ============================================================================
// Connector
// ============================================================================

/// A vendor connector
#[async_trait]
pub trait Connector: Send + Sync {
    /// Vendor display name used in logs and error messages
    fn vendor(&self) -> &'static str;

    /// Definitions owned by this connector
    fn definitions(&self) -> &DefinitionSet;

    /// Bind a definition, a task and a configuration into an execution
    ///
    /// Task and configuration are validated here so that mistakes surface
    /// before any vendor call is made.
    fn create_execution(
        &self,
        uid: Uuid,
        task: &str,
        config: &Document,
    ) -> Result<Box<dyn Execution>>;

    /// Check that a configuration can reach the vendor
    async fn test(&self, uid: Uuid, config: &Document) -> Result<ConnectionState>;

    /// Definition by UID, optionally enriched from the given configs
    async fn definition_by_uid(
        &self,
        uid: &Uuid,
        _resource_config: Option<&Document>,
        _component_config: Option<&Document>,
    ) -> Result<ConnectorDefinition> {
        self.definitions().by_uid(uid).cloned()
    }

    /// Definition by ID, optionally enriched from the given configs
    async fn definition_by_id(
        &self,
        id: &str,
        _resource_config: Option<&Document>,
        _component_config: Option<&Document>,
    ) -> Result<ConnectorDefinition> {
        self.definitions().by_id(id).cloned()
    }
}

// ============================================================================
// Execution
// ============================================================================

/// A task bound to a configuration, ready to run batches of inputs
#[async_trait]
pub trait Execution: Send + Sync {
    /// Run every input in order and return one output per input
    ///
    /// The first failing input aborts the batch. The returned error is an
    /// [`Error::Batch`] carrying the outputs completed so far.
    async fn execute(&self, inputs: Vec<Document>) -> Result<Vec<Document>>;
}

/// Run `f` over each input sequentially, collecting outputs in order
pub async fn execute_each<F, Fut>(inputs: Vec<Document>, mut f: F) -> Result<Vec<Document>>
where
    F: FnMut(Document) -> Fut,
    Fut: Future<Output = Result<Document>>,
{
    let mut outputs = Vec::with_capacity(inputs.len());
    for (index, input) in inputs.into_iter().enumerate() {
        match f(input).await {
            Ok(output) => outputs.push(output),
            Err(e) => return Err(Error::batch(index, outputs, e)),
        }
    }
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(n: i64) -> Document {
        let mut d = Document::new();
        d.insert("n".to_string(), json!(n));
        d
    }

    #[tokio::test]
    async fn test_execute_each_empty_batch() {
        let out = execute_each(vec![], |d| async move { Ok(d) }).await.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_execute_each_keeps_order() {
        let inputs = vec![doc(1), doc(2), doc(3)];
        let out = execute_each(inputs.clone(), |d| async move { Ok(d) })
            .await
            .unwrap();
        assert_eq!(out, inputs);
    }

    #[tokio::test]
    async fn test_execute_each_aborts_with_partial_outputs() {
        let mut calls = 0;
        let err = execute_each(vec![doc(1), doc(2), doc(3)], |d| {
            calls += 1;
            async move {
                if d.get("n") == Some(&json!(2)) {
                    Err(Error::input("boom"))
                } else {
                    Ok(d)
                }
            }
        })
        .await
        .unwrap_err();

        assert_eq!(calls, 2);
        assert_eq!(err.failed_index(), Some(1));
        assert_eq!(err.partial_outputs(), &[doc(1)]);
        assert_eq!(err.to_string(), "boom");
    }
}
