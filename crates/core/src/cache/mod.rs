//! In-memory cache for archived responses.
//!
//! This module provides the store the fetch pipeline consults before talking
//! to the archive. It supports:
//!
//! - Keys derived from (target date, resource URL)
//! - A byte-bounded LRU store with strict insertion/access recency
//! - A disabled variant for when caching is turned off

pub mod key;
pub mod memory;

use std::sync::Arc;

use bytes::Bytes;

use crate::config::CachingConfig;

pub use key::CacheKey;
pub use memory::MemoryCache;

/// A response served by the archive. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedResponse {
    pub content_type: String,
    pub payload: Bytes,
}

impl ArchivedResponse {
    pub fn new(content_type: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self { content_type: content_type.into(), payload: payload.into() }
    }

    /// Size counted against the cache bound.
    pub fn size(&self) -> u64 {
        self.payload.len() as u64
    }
}

/// Store of previously fetched archive responses.
///
/// Every operation completes without suspending, so a single call is atomic
/// with respect to other requests sharing the store.
pub trait WaybackCache: Send + Sync {
    /// Insert or overwrite the entry at `key`.
    fn add(&self, key: CacheKey, response: ArchivedResponse);

    /// Look up `key`, marking a hit as most recently used.
    fn try_get(&self, key: &CacheKey) -> Option<ArchivedResponse>;
}

/// Ignores all cache requests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCache;

impl WaybackCache for NullCache {
    fn add(&self, _key: CacheKey, _response: ArchivedResponse) {}

    fn try_get(&self, _key: &CacheKey) -> Option<ArchivedResponse> {
        None
    }
}

/// Build the cache the configuration asks for.
pub fn from_config(config: &CachingConfig) -> Arc<dyn WaybackCache> {
    if config.enabled {
        tracing::debug!(max_size = config.max_size, "snapshot cache enabled");
        Arc::new(MemoryCache::new(config.max_size))
    } else {
        tracing::debug!("snapshot cache disabled");
        Arc::new(NullCache)
    }
}
