//! In-process cache engine backed by Moka.

use crate::cache::engine::{CacheEngine, CacheItem, CallbackEntry, OperationContext};
use crate::cache::entry::CacheEntry;
use crate::cluster::statistics::CacheStatistics;
use crate::config::LocalCacheConfig;
use crate::error::{Error, Result};
use crate::types::BitSet;
use bytes::Bytes;
use moka::sync::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Local cache engine.
///
/// Serves as the authoritative engine on a single node and as the engine
/// behind async tasks and enumerators in tests.
pub struct LocalCache {
    /// The underlying Moka cache.
    cache: Cache<Bytes, CacheEntry>,

    /// Configured capacity, reported as the statistics max count.
    max_capacity: u64,

    /// Hit counter for statistics.
    hits: AtomicU64,

    /// Miss counter for statistics.
    misses: AtomicU64,
}

impl LocalCache {
    /// Create a new engine with the given configuration.
    pub fn new(config: &LocalCacheConfig) -> Self {
        let mut builder = Cache::builder().max_capacity(config.max_capacity);

        if let Some(ttl) = config.default_ttl {
            builder = builder.time_to_live(ttl);
        }

        Self {
            cache: builder.build(),
            max_capacity: config.max_capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Check if a key exists.
    pub fn contains(&self, key: &[u8]) -> bool {
        self.cache.contains_key(&Bytes::copy_from_slice(key))
    }

    /// Get the number of entries.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Run pending maintenance tasks.
    pub fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks();
    }

    /// Handle sharing this engine's storage, for readers that fetch
    /// entries one at a time.
    pub(crate) fn store(&self) -> Cache<Bytes, CacheEntry> {
        self.cache.clone()
    }

    /// Snapshot of all keys, in arbitrary order.
    pub fn keys(&self) -> Vec<Bytes> {
        self.cache.iter().map(|(k, _)| (*k).clone()).collect()
    }

    /// Statistics of this node.
    pub fn statistics(&self) -> CacheStatistics {
        let mut stats = CacheStatistics::new();
        stats.update_count(self.cache.entry_count());
        stats.max_count = self.max_capacity;
        stats.hit_count = self.hits.load(Ordering::Relaxed);
        stats.miss_count = self.misses.load(Ordering::Relaxed);
        stats
    }
}

impl CacheEngine for LocalCache {
    fn add(
        &self,
        key: &Bytes,
        item: &CacheItem,
        _provider_name: Option<&str>,
        _context: &OperationContext,
    ) -> Result<()> {
        let entry = self
            .cache
            .entry(key.clone())
            .or_insert_with(|| item.to_entry());

        if entry.is_fresh() {
            debug!(key_len = key.len(), "Added entry");
            Ok(())
        } else {
            Err(Error::Cache("the specified key already exists".to_string()))
        }
    }

    fn insert(
        &self,
        key: &Bytes,
        item: &CacheItem,
        _provider_name: Option<&str>,
        _context: &OperationContext,
    ) -> Result<u64> {
        let version = self
            .cache
            .get(key)
            .map(|existing| existing.version() + 1)
            .unwrap_or(1);

        self.cache
            .insert(key.clone(), item.to_entry().with_version(version));
        Ok(version)
    }

    fn remove(
        &self,
        key: &Bytes,
        _flags: BitSet,
        _notification: Option<&CallbackEntry>,
        _provider_name: Option<&str>,
        _context: &OperationContext,
    ) -> Result<Option<CacheEntry>> {
        Ok(self.cache.remove(key))
    }

    fn clear(
        &self,
        _flags: BitSet,
        _notification: Option<&CallbackEntry>,
        _provider_name: Option<&str>,
        _context: &OperationContext,
    ) -> Result<()> {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks();
        Ok(())
    }

    fn get(&self, key: &Bytes, _context: &OperationContext) -> Result<Option<CacheEntry>> {
        let result = self.cache.get(key);

        if result.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }

        Ok(result)
    }
}

impl std::fmt::Debug for LocalCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCache")
            .field("entry_count", &self.entry_count())
            .field("max_capacity", &self.max_capacity)
            .finish()
    }
}
