//! Byte-bounded LRU store.
//!
//! Recency is updated on both insertion and access. Before each insertion the
//! least recently used entries are evicted until the incoming entry fits. An
//! entry larger than the whole bound empties the store and is admitted anyway,
//! leaving the store over its bound until the next insertion.

use lru::LruCache;
use parking_lot::Mutex;

use super::{ArchivedResponse, CacheKey, WaybackCache};

/// Caches archived responses in memory, bounded by total payload bytes.
#[derive(Debug)]
pub struct MemoryCache {
    inner: Mutex<CacheInner>,
    max_bytes: u64,
}

#[derive(Debug)]
struct CacheInner {
    entries: LruCache<CacheKey, ArchivedResponse>,
    resident_bytes: u64,
}

impl MemoryCache {
    /// Construct a cache that may hold up to `max_bytes` of payload.
    pub fn new(max_bytes: u64) -> Self {
        Self { inner: Mutex::new(CacheInner { entries: LruCache::unbounded(), resident_bytes: 0 }), max_bytes }
    }

    /// Sum of the payload sizes currently held.
    pub fn resident_bytes(&self) -> u64 {
        self.inner.lock().resident_bytes
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Presence check that leaves recency untouched.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.inner.lock().entries.contains(key)
    }
}

impl WaybackCache for MemoryCache {
    fn add(&self, key: CacheKey, response: ArchivedResponse) {
        let size = response.size();
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        if let Some(previous) = inner.entries.pop(&key) {
            inner.resident_bytes = inner.resident_bytes.saturating_sub(previous.size());
        }

        while inner.resident_bytes + size > self.max_bytes {
            match inner.entries.pop_lru() {
                Some((evicted_key, evicted)) => {
                    inner.resident_bytes = inner.resident_bytes.saturating_sub(evicted.size());
                    tracing::trace!(key = %evicted_key, bytes = evicted.size(), "evicted cached snapshot");
                }
                None => break,
            }
        }

        if size > self.max_bytes {
            tracing::warn!(
                key = %key,
                bytes = size,
                max_bytes = self.max_bytes,
                "cached snapshot exceeds the cache bound on its own"
            );
        }

        inner.resident_bytes += size;
        inner.entries.push(key, response);
    }

    fn try_get(&self, key: &CacheKey) -> Option<ArchivedResponse> {
        self.inner.lock().entries.get(key).cloned()
    }
}
