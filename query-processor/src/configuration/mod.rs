//! Logic for loading configuration in to an object model
mod limits;

use std::num::NonZeroUsize;
use std::str::FromStr;

use derivative::Derivative;
use displaydoc::Display;
use schemars::JsonSchema;
use schemars::schema::RootSchema;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

pub use self::limits::Limits;

/// Configuration error.
#[derive(Debug, Error, Display)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// {message}: {error}
    InvalidConfiguration {
        message: &'static str,
        error: String,
    },
    /// could not deserialize configuration: {0}
    DeserializeConfigError(serde_json::Error),
}

/// The configuration for the query processor.
///
/// Can be created through `serde::Deserialize` from various formats,
/// or inline in Rust code with `serde_json::json!` and `serde_json::from_value`.
#[derive(Clone, Derivative, Deserialize, Serialize, JsonSchema)]
#[derivative(Debug, Default)]
#[serde(deny_unknown_fields, default)]
pub struct Configuration {
    /// Development mode: cache lookups are skipped and no result is ever cached.
    pub development: bool,

    /// Operation batching.
    pub batching: Batching,

    /// Document parser settings.
    pub parser: Parser,

    /// Result caching.
    pub cache: Cache,

    /// Operation limits, enforced as validation rules.
    pub limits: Limits,

    /// Whether `__schema` and `__type` may be queried.
    #[derivative(Default(value = "default_introspection()"))]
    pub introspection: bool,
}

#[buildstructor::buildstructor]
impl Configuration {
    #[builder(visibility = "pub")]
    fn new(
        development: Option<bool>,
        batching: Option<Batching>,
        parser: Option<Parser>,
        cache: Option<Cache>,
        limits: Option<Limits>,
        introspection: Option<bool>,
    ) -> Self {
        Self {
            development: development.unwrap_or_default(),
            batching: batching.unwrap_or_default(),
            parser: parser.unwrap_or_default(),
            cache: cache.unwrap_or_default(),
            limits: limits.unwrap_or_default(),
            introspection: introspection.unwrap_or_else(default_introspection),
        }
    }

    /// Parse and check a YAML configuration document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigurationError> {
        let value: serde_json::Value =
            serde_yaml::from_str(yaml).map_err(|e| ConfigurationError::InvalidConfiguration {
                message: "failed to parse yaml",
                error: e.to_string(),
            })?;
        let configuration: Configuration = serde_json::from_value(value)
            .map_err(ConfigurationError::DeserializeConfigError)?;
        configuration.validate()
    }

    pub(crate) fn validate(self) -> Result<Self, ConfigurationError> {
        if self.parser.recursion_limit == 0 {
            return Err(ConfigurationError::InvalidConfiguration {
                message: "parser.recursion_limit must be greater than 0",
                error: "0".to_string(),
            });
        }
        Ok(self)
    }
}

impl FromStr for Configuration {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_yaml(s)
    }
}

/// Generate a JSON schema for the configuration.
pub fn generate_config_schema() -> RootSchema {
    schemars::schema_for!(Configuration)
}

/// Operation batching.
#[derive(Clone, Debug, Derivative, Deserialize, Serialize, JsonSchema)]
#[derivative(Default)]
#[serde(deny_unknown_fields, default)]
pub struct Batching {
    /// Accept an array of operations in a single request.
    /// Enabled by default.
    #[derivative(Default(value = "true"))]
    pub enabled: bool,
}

/// Document parser settings.
#[derive(Clone, Debug, Derivative, Deserialize, Serialize, JsonSchema)]
#[derivative(Default)]
#[serde(deny_unknown_fields, default)]
pub struct Parser {
    /// Maximum nesting the parser accepts before giving up.
    #[derivative(Default(value = "default_parser_recursion_limit()"))]
    pub recursion_limit: usize,

    /// Maximum number of tokens in a document.
    #[derivative(Default(value = "default_parser_token_limit()"))]
    pub token_limit: usize,
}

/// Result caching.
#[derive(Clone, Debug, Derivative, Deserialize, Serialize, JsonSchema)]
#[derivative(Default)]
#[serde(deny_unknown_fields, default)]
pub struct Cache {
    /// Look results up in and write results to the cache store.
    #[derivative(Default(value = "true"))]
    pub enabled: bool,

    /// Tags attached to every cached result, usable for invalidation.
    #[derivative(Default(value = "default_cache_tags()"))]
    pub tags: Vec<String>,

    /// Settings for the bundled in-memory store.
    pub in_memory: InMemoryCache,
}

/// Settings for the bundled in-memory store.
#[derive(Clone, Debug, Derivative, Deserialize, Serialize, JsonSchema)]
#[derivative(Default)]
#[serde(deny_unknown_fields, default)]
pub struct InMemoryCache {
    /// Number of entries kept before the least recently used is evicted.
    #[derivative(Default(value = "default_cache_limit()"))]
    pub limit: NonZeroUsize,
}

fn default_introspection() -> bool {
    true
}

fn default_parser_recursion_limit() -> usize {
    500
}

fn default_parser_token_limit() -> usize {
    15_000
}

fn default_cache_tags() -> Vec<String> {
    vec!["graphql_response".to_string()]
}

fn default_cache_limit() -> NonZeroUsize {
    NonZeroUsize::new(512).unwrap_or(NonZeroUsize::MIN)
}
