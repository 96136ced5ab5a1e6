//! Cache statistics types
//!
//! `StoreStats` is the snapshot a `CacheStore` reports for observability
//! (the `/api/cache-stats` payload).

use serde::Serialize;

/// Store statistics for monitoring and metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Current number of entries
    pub entries: u64,
    /// Number of lookups that found an entry
    pub hits: u64,
    /// Number of lookups that found nothing
    pub misses: u64,
    /// Number of entries removed to make room
    pub evictions: u64,
    /// Capacity bound (0 for stores that never retain entries)
    pub max_entries: u64,
}

impl StoreStats {
    /// Calculate hit rate (hits / total lookups)
    /// Returns 0.0 if there are no lookups
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
