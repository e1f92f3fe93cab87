use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use tracing::Instrument;

use super::key::ContentHash;
use super::key::ContextResolver;
use super::key::context_key;
use super::key::result_key;
use super::storage::CacheStore;
use crate::context::CacheMetadata;
use crate::response::QueryResult;

/// What is stored under a result key.
#[derive(Serialize, Deserialize)]
struct CachedResult {
    result: QueryResult,
    metadata: CacheMetadata,
}

/// Reads and writes results using the two-tier key scheme.
#[derive(Clone)]
pub(crate) struct TieredCache {
    store: Arc<dyn CacheStore>,
}

impl TieredCache {
    pub(crate) fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Find a result cached for `hash` under the current values of the
    /// contexts it varied by last time.
    pub(crate) async fn get(
        &self,
        hash: &ContentHash,
        resolver: &dyn ContextResolver,
    ) -> Option<QueryResult> {
        async {
            let Some(value) = self.store.get(&context_key(hash)).await else {
                tracing::trace!("cache miss: no cache contexts");
                return None;
            };
            let contexts: BTreeSet<String> = match serde_json_bytes::from_value(value) {
                Ok(contexts) => contexts,
                Err(error) => {
                    tracing::debug!(%error, "could not read cached contexts");
                    return None;
                }
            };

            let key = result_key(hash, &contexts, resolver);
            let Some(value) = self.store.get(&key).await else {
                tracing::trace!(%key, "cache miss");
                return None;
            };
            match serde_json_bytes::from_value::<CachedResult>(value) {
                Ok(CachedResult {
                    mut result,
                    metadata,
                }) => {
                    tracing::trace!(%key, "cache hit");
                    result.metadata = metadata;
                    Some(result)
                }
                Err(error) => {
                    tracing::debug!(%key, %error, "could not read cached result");
                    None
                }
            }
        }
        .instrument(tracing::trace_span!("cache_lookup", hash = %hash))
        .await
    }

    /// Store a cacheable result.
    ///
    /// The contexts are written under the content hash and the result under the
    /// key derived from those same contexts. Results with a max-age of zero are
    /// never stored.
    pub(crate) async fn insert(
        &self,
        hash: &ContentHash,
        resolver: &dyn ContextResolver,
        result: &QueryResult,
    ) {
        let metadata = &result.metadata;
        if !metadata.is_cacheable() {
            return;
        }
        let ttl = metadata.max_age.ttl();
        let tags: Vec<String> = metadata.tags.iter().cloned().collect();
        let key = result_key(hash, &metadata.contexts, resolver);

        let entry = CachedResult {
            result: result.clone(),
            metadata: metadata.clone(),
        };
        let (contexts, entry) = match (
            serde_json_bytes::to_value(&metadata.contexts),
            serde_json_bytes::to_value(&entry),
        ) {
            (Ok(contexts), Ok(entry)) => (contexts, entry),
            (Err(error), _) | (_, Err(error)) => {
                tracing::warn!(%error, "could not serialize result for caching");
                return;
            }
        };

        tracing::debug!(%key, ?ttl, "caching result");
        self.store
            .set(context_key(hash), contexts, ttl, tags.clone())
            .await;
        self.store.set(key, entry, ttl, tags).await;
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use serde_json_bytes::json;

    use super::*;
    use crate::cache::InMemoryCacheStore;
    use crate::cache::StaticContextResolver;
    use crate::context::MaxAge;

    fn hash() -> ContentHash {
        let document = crate::spec::parse("{ me { id } }", &Default::default()).unwrap();
        ContentHash::new(&document, &Default::default())
    }

    fn result(contexts: &[&str], max_age: MaxAge) -> QueryResult {
        QueryResult::builder()
            .data(json!({"me": {"id": "1"}}))
            .metadata(
                CacheMetadata::builder()
                    .contexts(
                        contexts
                            .iter()
                            .map(|c| c.to_string())
                            .collect::<BTreeSet<_>>(),
                    )
                    .tag("graphql_response")
                    .max_age(max_age)
                    .build(),
            )
            .build()
    }

    fn cache() -> (InMemoryCacheStore, TieredCache) {
        let store = InMemoryCacheStore::new(NonZeroUsize::new(10).unwrap());
        let cache = TieredCache::new(Arc::new(store.clone()));
        (store, cache)
    }

    #[tokio::test]
    async fn round_trip() {
        let (store, cache) = cache();
        let resolver = StaticContextResolver::new([("user.roles", "admin")]);
        let hash = hash();
        assert_eq!(cache.get(&hash, &resolver).await, None);

        let stored = result(&["user.roles"], MaxAge::Seconds(60));
        cache.insert(&hash, &resolver, &stored).await;
        assert_eq!(store.len(), 2);
        assert!(store.contains_key(&format!("ctx:{hash}")));
        assert!(store.contains_key(&format!("res:{hash}:[user.roles]=admin")));
        assert_eq!(cache.get(&hash, &resolver).await, Some(stored));
    }

    #[tokio::test]
    async fn empty_contexts_still_hit() {
        let (store, cache) = cache();
        let resolver = StaticContextResolver::default();
        let hash = hash();
        let stored = result(&[], MaxAge::Unbounded);
        cache.insert(&hash, &resolver, &stored).await;
        assert!(store.contains_key(&format!("res:{hash}")));
        assert_eq!(cache.get(&hash, &resolver).await, Some(stored));
    }

    #[tokio::test]
    async fn uncacheable_results_are_not_stored() {
        let (store, cache) = cache();
        let resolver = StaticContextResolver::default();
        cache
            .insert(&hash(), &resolver, &result(&[], MaxAge::UNCACHEABLE))
            .await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn other_context_values_miss() {
        let (_, cache) = cache();
        let hash = hash();
        let admin = StaticContextResolver::new([("user.roles", "admin")]);
        let anonymous = StaticContextResolver::new([("user.roles", "anonymous")]);
        cache
            .insert(&hash, &admin, &result(&["user.roles"], MaxAge::Unbounded))
            .await;
        assert_eq!(cache.get(&hash, &anonymous).await, None);
        assert!(cache.get(&hash, &admin).await.is_some());
    }

    #[tokio::test]
    async fn undecodable_entries_are_misses() {
        let (store, cache) = cache();
        let resolver = StaticContextResolver::default();
        let hash = hash();
        store
            .set(context_key(&hash), json!("not a list"), None, vec![])
            .await;
        assert_eq!(cache.get(&hash, &resolver).await, None);

        store.set(context_key(&hash), json!([]), None, vec![]).await;
        store
            .set(format!("res:{hash}"), json!({"unexpected": true}), None, vec![])
            .await;
        assert_eq!(cache.get(&hash, &resolver).await, None);
    }
}
