use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use serde_json_bytes::Value;
use tokio::time::Instant;

/// A key-value store holding cached results.
///
/// Stores are best effort: a failing `get` is a miss and a failing `set` is
/// dropped.
#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Option<Value>;

    /// Store `value` under `key`. `ttl` of `None` keeps the entry until it is
    /// evicted or invalidated.
    async fn set(&self, key: String, value: Value, ttl: Option<Duration>, tags: Vec<String>);
}

#[derive(Clone, Debug)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
    tags: Vec<String>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

/// An in memory, LRU bounded [`CacheStore`] with expiry and tag invalidation.
#[derive(Clone)]
pub struct InMemoryCacheStore {
    inner: Arc<Mutex<LruCache<String, Entry>>>,
}

impl InMemoryCacheStore {
    pub fn new(max_capacity: NonZeroUsize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LruCache::new(max_capacity))),
        }
    }

    /// Remove every entry carrying one of `tags`.
    pub fn invalidate_tags<S: AsRef<str>>(&self, tags: &[S]) -> usize {
        let mut inner = self.inner.lock();
        let keys: Vec<String> = inner
            .iter()
            .filter(|(_, entry)| {
                entry
                    .tags
                    .iter()
                    .any(|tag| tags.iter().any(|invalid| invalid.as_ref() == tag))
            })
            .map(|(key, _)| key.clone())
            .collect();
        for key in &keys {
            inner.pop(key);
        }
        tracing::debug!(count = keys.len(), "invalidated cache entries");
        keys.len()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.lock().contains(key)
    }
}

impl std::fmt::Debug for InMemoryCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCacheStore")
            .field("len", &self.len())
            .finish()
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str) -> Option<Value> {
        let mut inner = self.inner.lock();
        let entry = inner.get(key)?;
        if entry.is_expired(Instant::now()) {
            inner.pop(key);
            return None;
        }
        Some(entry.value.clone())
    }

    async fn set(&self, key: String, value: Value, ttl: Option<Duration>, tags: Vec<String>) {
        let entry = Entry {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
            tags,
        };
        self.inner.lock().put(key, entry);
    }
}
