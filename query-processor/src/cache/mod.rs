//! Result caching.
//!
//! Results are cached in two tiers. The first maps the content hash of an
//! operation to the cache contexts its last cacheable execution reported; the
//! second maps the content hash plus the current values of those contexts to the
//! result. A lookup therefore needs no knowledge of what a result varies by
//! before it has been executed once.

pub(crate) mod key;
pub(crate) mod storage;
pub(crate) mod tiered;

pub use self::key::ContentHash;
pub use self::key::ContextResolver;
pub use self::key::StaticContextResolver;
pub use self::storage::CacheStore;
pub use self::storage::InMemoryCacheStore;
