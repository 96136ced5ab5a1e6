//! Memory store implementation using moka
//!
//! This module provides `MemoryStore`, the default `CacheStore`:
//! - Bounded by entry count (`max_entries`)
//! - Least-recently-used eviction when full
//! - Thread-safe concurrent access without external locking
//! - Statistics tracking (hits, misses, evictions)
//!
//! Also provides `NullStore` which never retains anything.

use async_trait::async_trait;
use moka::notification::RemovalCause;
use moka::policy::EvictionPolicy;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::entry::CacheEntry;
use super::error::CacheError;
use super::stats::StoreStats;
use super::traits::CacheStore;

/// Thread-safe statistics tracker using atomic counters
pub(crate) struct CacheStatsTracker {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl CacheStatsTracker {
    pub fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn increment_hits(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_misses(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_evictions(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of current statistics
    pub fn snapshot(&self, entries: u64, max_entries: u64) -> StoreStats {
        StoreStats {
            entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            max_entries,
        }
    }
}

/// MemoryStore wraps moka for the CacheStore trait
pub struct MemoryStore {
    cache: moka::future::Cache<String, CacheEntry>,
    stats: Arc<CacheStatsTracker>,
    max_entries: u64,
}

impl MemoryStore {
    /// Create a store holding at most `max_entries` pages
    pub fn new(max_entries: u64) -> Self {
        // Create stats tracker first so we can share it with the eviction listener
        let stats = Arc::new(CacheStatsTracker::new());
        let listener_stats = stats.clone();

        let cache = moka::future::Cache::builder()
            .max_capacity(max_entries)
            .eviction_policy(EvictionPolicy::lru())
            .eviction_listener(move |key, _value, cause| {
                // Explicit removals (invalidation, replace) are not evictions
                if matches!(cause, RemovalCause::Size) {
                    listener_stats.increment_evictions();
                    tracing::debug!(key = %key, "Evicted least recently used page");
                }
            })
            .build();

        Self {
            cache,
            stats,
            max_entries,
        }
    }

    /// Get current entry count (approximate until pending tasks have run)
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Keys of all live entries, in no particular order
    #[cfg(test)]
    pub(crate) fn keys(&self) -> Vec<String> {
        self.cache.iter().map(|(key, _)| (*key).clone()).collect()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        match self.cache.get(key).await {
            Some(entry) => {
                self.stats.increment_hits();
                Ok(Some(entry))
            }
            None => {
                self.stats.increment_misses();
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, entry: CacheEntry) -> Result<(), CacheError> {
        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.cache.remove(key).await.is_some())
    }

    async fn invalidate_by_tags(&self, tags: &[String]) -> Result<usize, CacheError> {
        if tags.is_empty() {
            return Ok(0);
        }

        // Collect first; moka's iterator must not be held across removals
        let matching: Vec<Arc<String>> = self
            .cache
            .iter()
            .filter(|(_, entry)| entry.has_any_tag(tags))
            .map(|(key, _)| key)
            .collect();

        let mut removed = 0;
        for key in matching {
            if self.cache.remove(key.as_str()).await.is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn invalidate_by_paths(&self, paths: &[String]) -> Result<usize, CacheError> {
        let mut removed = 0;
        for path in paths {
            if self.cache.remove(path.as_str()).await.is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats, CacheError> {
        self.cache.run_pending_tasks().await;
        Ok(self.stats.snapshot(self.cache.entry_count(), self.max_entries))
    }

    async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }
}

/// NullStore never retains entries; every lookup is a miss
#[derive(Debug, Default)]
pub struct NullStore;

#[async_trait]
impl CacheStore for NullStore {
    async fn get(&self, _key: &str) -> Result<Option<CacheEntry>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _entry: CacheEntry) -> Result<(), CacheError> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<bool, CacheError> {
        Ok(false)
    }

    async fn invalidate_by_tags(&self, _tags: &[String]) -> Result<usize, CacheError> {
        Ok(0)
    }

    async fn invalidate_by_paths(&self, _paths: &[String]) -> Result<usize, CacheError> {
        Ok(0)
    }

    async fn clear(&self) -> Result<(), CacheError> {
        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats, CacheError> {
        Ok(StoreStats::default())
    }
}
