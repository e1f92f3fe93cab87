use std::collections::HashMap;

use apollo_compiler::ast;
use apollo_compiler::parser::Parser;
use apollo_compiler::validation::WithErrors;
use async_trait::async_trait;
use displaydoc::Display;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use super::PersistedQuery;
use super::PersistedQueryLoader;
use crate::request::OperationParams;

const MANIFEST_FORMAT: &str = "apollo-persisted-query-manifest";

/// A single operation containing an ID and a body,
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestOperation {
    /// The operation ID (usually a hash).
    pub id: String,
    /// The operation body.
    pub body: String,
}

/// The format of a persisted query manifest file.
#[derive(Debug, Clone, Deserialize, Serialize)]
struct ManifestFile {
    format: String,
    version: u64,
    operations: Vec<ManifestOperation>,
}

/// Errors loading a persisted query manifest.
#[derive(Debug, Error, Display)]
#[non_exhaustive]
pub enum PersistedQueryManifestError {
    /// could not parse persisted query manifest: {0}
    Parse(serde_json::Error),
    /// manifest format is not 'apollo-persisted-query-manifest'
    Format,
    /// persisted query manifest version is not 1
    Version,
    /// persisted query '{id}' is not a valid document: {reason}
    InvalidOperation { id: String, reason: String },
}

/// An in memory set of persisted queries, parsed once when loaded.
#[derive(Debug, Clone, Default)]
pub struct PersistedQueryManifest {
    inner: HashMap<String, ast::Document>,
}

impl PersistedQueryManifest {
    /// Parse a JSON manifest with `format`, `version` and `operations`.
    pub fn parse_and_validate(raw_manifest: &str) -> Result<Self, PersistedQueryManifestError> {
        let manifest = serde_json::from_str::<ManifestFile>(raw_manifest)
            .map_err(PersistedQueryManifestError::Parse)?;
        if manifest.format != MANIFEST_FORMAT {
            return Err(PersistedQueryManifestError::Format);
        }
        if manifest.version != 1 {
            return Err(PersistedQueryManifestError::Version);
        }
        Self::from_operations(manifest.operations)
    }

    pub fn from_operations(
        operations: impl IntoIterator<Item = ManifestOperation>,
    ) -> Result<Self, PersistedQueryManifestError> {
        let mut manifest = Self::default();
        for operation in operations {
            manifest.insert(operation)?;
        }
        Ok(manifest)
    }

    /// Add an operation, replacing any operation with the same id.
    pub fn insert(
        &mut self,
        operation: ManifestOperation,
    ) -> Result<(), PersistedQueryManifestError> {
        let ManifestOperation { id, body } = operation;
        let document = Parser::new()
            .parse_ast(body, "persisted_query.graphql")
            .map_err(
                |WithErrors { errors, .. }| PersistedQueryManifestError::InvalidOperation {
                    id: id.clone(),
                    reason: errors.to_string(),
                },
            )?;
        self.inner.insert(id, document);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl PersistedQueryLoader for PersistedQueryManifest {
    async fn load(&self, id: &str, _params: &OperationParams) -> Option<PersistedQuery> {
        self.inner.get(id).cloned().map(PersistedQuery::Document)
    }
}
