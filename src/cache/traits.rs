//! Cache store trait definition
//!
//! This module defines the `CacheStore` trait that every page cache backend
//! must satisfy. All operations are async so that networked stores fit the
//! same contract as the in-memory default.

use async_trait::async_trait;

use super::entry::CacheEntry;
use super::error::CacheError;
use super::stats::StoreStats;

/// Pluggable storage for rendered pages, keyed by cache key
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get an entry by key. Stale entries are returned; staleness is decided
    /// by the caller.
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError>;

    /// Store an entry, atomically replacing any previous value for the key
    async fn set(&self, key: &str, entry: CacheEntry) -> Result<(), CacheError>;

    /// Delete an entry by key
    /// Returns true if the entry was deleted, false if it didn't exist
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Remove every entry whose tags intersect `tags`
    /// Returns the number of entries removed
    async fn invalidate_by_tags(&self, tags: &[String]) -> Result<usize, CacheError>;

    /// Remove the entries whose key exactly equals one of `paths`
    /// Returns the number of entries removed
    async fn invalidate_by_paths(&self, paths: &[String]) -> Result<usize, CacheError>;

    /// Remove all entries
    async fn clear(&self) -> Result<(), CacheError>;

    async fn stats(&self) -> Result<StoreStats, CacheError>;

    /// Run pending async tasks (for stores that use async backends like moka)
    /// Default implementation is a no-op
    async fn run_pending_tasks(&self) {}
}
