//! Persisted queries: operations sent by id instead of by source.

mod manifest;

use apollo_compiler::ast;
use async_trait::async_trait;

pub use self::manifest::ManifestOperation;
pub use self::manifest::PersistedQueryManifest;
pub use self::manifest::PersistedQueryManifestError;
use crate::request::OperationParams;

/// What a loader returns for a known id.
#[derive(Clone, Debug)]
pub enum PersistedQuery {
    /// Source text still to be parsed.
    Source(String),
    /// An already parsed document.
    Document(ast::Document),
}

/// Maps a persisted query id to its document.
#[async_trait]
pub trait PersistedQueryLoader: Send + Sync + 'static {
    /// Returns `None` for unknown ids.
    async fn load(&self, id: &str, params: &OperationParams) -> Option<PersistedQuery>;
}
