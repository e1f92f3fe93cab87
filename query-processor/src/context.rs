//! Per-operation state shared with the executor.
//!
//! A [`ResolveContext`] is created for each operation. Resolvers record what the
//! result depends on (cache contexts), what may invalidate it (cache tags) and for
//! how long it stays fresh (max-age). The processor turns this into the
//! [`CacheMetadata`] attached to the result.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::json_ext::Object;
use crate::json_ext::Value;

/// Global set to `true` when the caller may bypass field level security.
pub const BYPASS_FIELD_SECURITY: &str = "bypass field security";

/// Global set to `true` when the processor runs in development mode.
pub const DEVELOPMENT: &str = "development";

/// Cache contexts starting with this prefix describe response languages.
///
/// They are handled by the transport layer and never take part in cache keys.
pub const LANGUAGE_CONTEXT_PREFIX: &str = "languages:";

/// How long a result may be served from cache.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxAge {
    /// Cacheable until invalidated.
    #[default]
    Unbounded,
    /// Cacheable for this many seconds. Zero means not cacheable.
    Seconds(u32),
}

impl MaxAge {
    /// Must not be cached.
    pub const UNCACHEABLE: MaxAge = MaxAge::Seconds(0);

    /// The most restrictive of both.
    pub fn merge(self, other: MaxAge) -> MaxAge {
        match (self, other) {
            (MaxAge::Unbounded, other) => other,
            (this, MaxAge::Unbounded) => this,
            (MaxAge::Seconds(a), MaxAge::Seconds(b)) => MaxAge::Seconds(a.min(b)),
        }
    }

    pub fn is_cacheable(self) -> bool {
        self != MaxAge::UNCACHEABLE
    }

    /// The time to live of a cache entry, `None` for no expiry.
    pub fn ttl(self) -> Option<Duration> {
        match self {
            MaxAge::Unbounded => None,
            MaxAge::Seconds(seconds) => Some(Duration::from_secs(seconds.into())),
        }
    }
}

impl From<Duration> for MaxAge {
    fn from(duration: Duration) -> Self {
        MaxAge::Seconds(u32::try_from(duration.as_secs()).unwrap_or(u32::MAX))
    }
}

/// Cacheability of a result.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheMetadata {
    /// Abstract tokens the result varies by, such as `user.roles`.
    pub contexts: BTreeSet<String>,
    /// Invalidation tags.
    pub tags: BTreeSet<String>,
    pub max_age: MaxAge,
}

#[buildstructor::buildstructor]
impl CacheMetadata {
    #[builder(visibility = "pub")]
    fn new(contexts: BTreeSet<String>, tags: BTreeSet<String>, max_age: Option<MaxAge>) -> Self {
        Self {
            contexts,
            tags,
            max_age: max_age.unwrap_or_default(),
        }
    }

    /// Folds `other` into `self`: sets are unioned and the lowest max-age wins.
    pub fn merge(&mut self, other: &CacheMetadata) {
        self.contexts.extend(other.contexts.iter().cloned());
        self.tags.extend(other.tags.iter().cloned());
        self.max_age = self.max_age.merge(other.max_age);
    }

    pub fn is_cacheable(&self) -> bool {
        self.max_age.is_cacheable()
    }

    pub(crate) fn remove_language_contexts(&mut self) {
        self.contexts
            .retain(|context| !context.starts_with(LANGUAGE_CONTEXT_PREFIX));
    }
}

/// Mutable state of one operation, handed to the executor.
#[derive(Clone, Debug, Default)]
pub struct ResolveContext {
    globals: Arc<Object>,
    metadata: CacheMetadata,
}

impl ResolveContext {
    pub fn new(globals: Arc<Object>) -> Self {
        Self {
            globals,
            metadata: CacheMetadata::default(),
        }
    }

    /// Values shared by every operation of the request.
    pub fn globals(&self) -> &Object {
        &self.globals
    }

    pub fn global(&self, key: &str) -> Option<&Value> {
        self.globals.get(key)
    }

    /// Returns `true` if the named global is the boolean `true`.
    pub fn global_flag(&self, key: &str) -> bool {
        matches!(self.global(key), Some(Value::Bool(true)))
    }

    pub fn add_cache_contexts<I, S>(&mut self, contexts: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metadata
            .contexts
            .extend(contexts.into_iter().map(Into::into));
    }

    pub fn add_cache_tags<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metadata.tags.extend(tags.into_iter().map(Into::into));
    }

    /// Lowers the max-age; it never increases.
    pub fn merge_cache_max_age(&mut self, max_age: MaxAge) {
        self.metadata.max_age = self.metadata.max_age.merge(max_age);
    }

    pub fn add_cacheable_dependency(&mut self, dependency: &CacheMetadata) {
        self.metadata.merge(dependency);
    }

    pub fn cache_metadata(&self) -> &CacheMetadata {
        &self.metadata
    }

    pub(crate) fn into_cache_metadata(self) -> CacheMetadata {
        self.metadata
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;

    #[test]
    fn max_age_only_decreases() {
        assert_eq!(MaxAge::Unbounded.merge(MaxAge::Seconds(60)), MaxAge::Seconds(60));
        assert_eq!(MaxAge::Seconds(60).merge(MaxAge::Unbounded), MaxAge::Seconds(60));
        assert_eq!(MaxAge::Seconds(60).merge(MaxAge::Seconds(10)), MaxAge::Seconds(10));
        assert_eq!(MaxAge::Seconds(10).merge(MaxAge::Seconds(60)), MaxAge::Seconds(10));
        assert_eq!(MaxAge::Unbounded.merge(MaxAge::Unbounded), MaxAge::Unbounded);
        assert!(!MaxAge::Seconds(10).merge(MaxAge::UNCACHEABLE).is_cacheable());
    }

    #[test]
    fn ttl() {
        assert_eq!(MaxAge::Unbounded.ttl(), None);
        assert_eq!(MaxAge::Seconds(5).ttl(), Some(Duration::from_secs(5)));
        assert_eq!(MaxAge::from(Duration::from_secs(90)), MaxAge::Seconds(90));
    }

    #[test]
    fn accumulates_metadata() {
        let globals = json!({"development": true});
        let mut context = ResolveContext::new(Arc::new(globals.as_object().unwrap().clone()));
        assert!(context.global_flag(DEVELOPMENT));
        assert!(!context.global_flag(BYPASS_FIELD_SECURITY));

        context.add_cache_contexts(["user.roles"]);
        context.add_cache_tags(vec!["node:1".to_string()]);
        context.merge_cache_max_age(MaxAge::Seconds(300));
        context.add_cacheable_dependency(
            &CacheMetadata::builder()
                .context("url.query_args")
                .tag("node:2")
                .max_age(MaxAge::Seconds(60))
                .build(),
        );
        context.merge_cache_max_age(MaxAge::Seconds(120));

        let metadata = context.into_cache_metadata();
        assert_eq!(
            metadata.contexts.iter().collect::<Vec<_>>(),
            ["url.query_args", "user.roles"]
        );
        assert_eq!(metadata.tags.iter().collect::<Vec<_>>(), ["node:1", "node:2"]);
        assert_eq!(metadata.max_age, MaxAge::Seconds(60));
    }

    #[test]
    fn language_contexts_are_removed() {
        let mut metadata = CacheMetadata::builder()
            .context("languages:language_interface")
            .context("user.permissions")
            .build();
        metadata.remove_language_contexts();
        assert_eq!(
            metadata.contexts.into_iter().collect::<Vec<_>>(),
            ["user.permissions"]
        );
    }
}
