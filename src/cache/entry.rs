//! Cache key and entry types
//!
//! This module defines the core page cache structures:
//! - `CacheStrategy`: how a rendered page may be cached
//! - `CacheEntry`: rendered HTML plus the metadata for staleness and tag invalidation
//! - `CacheStatus` / `CacheResult`: what a lookup returns to the caller
//! - `Rendered`: what a render callback produces

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

/// Caching policy for a page
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CacheStrategy {
    /// Cache forever; never becomes stale
    Static,
    /// Never cache; render on every request
    Dynamic,
    /// Cache with a revalidation deadline and invalidation tags
    TimedTags {
        revalidate_seconds: u64,
        #[serde(default)]
        tags: Vec<String>,
    },
}

impl CacheStrategy {
    pub fn timed(revalidate_seconds: u64, tags: &[&str]) -> Self {
        CacheStrategy::TimedTags {
            revalidate_seconds,
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
        }
    }

    /// Whether entries rendered under this strategy are written to the store
    pub fn is_cacheable(&self) -> bool {
        !matches!(self, CacheStrategy::Dynamic)
    }

    pub fn tags(&self) -> &[String] {
        match self {
            CacheStrategy::TimedTags { tags, .. } => tags,
            _ => &[],
        }
    }
}

/// A cached page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub html: String,
    pub created_at: SystemTime,
    /// Deadline after which the entry is stale. None means never stale.
    pub revalidate_after: Option<SystemTime>,
    pub tags: Vec<String>,
    pub strategy: CacheStrategy,
}

impl CacheEntry {
    /// Create an entry rendered now
    pub fn new(html: impl Into<String>, strategy: CacheStrategy) -> Self {
        Self::with_created_at(html, strategy, SystemTime::now())
    }

    /// Create an entry as if it had been rendered at `created_at`.
    ///
    /// - `Static`: no deadline
    /// - `TimedTags`: deadline is `created_at + revalidate_seconds`
    /// - `Dynamic`: deadline is `created_at` (stale as soon as time moves)
    pub fn with_created_at(html: impl Into<String>, strategy: CacheStrategy, created_at: SystemTime) -> Self {
        let revalidate_after = match &strategy {
            CacheStrategy::Static => None,
            CacheStrategy::Dynamic => Some(created_at),
            CacheStrategy::TimedTags { revalidate_seconds, .. } => {
                Some(created_at + Duration::from_secs(*revalidate_seconds))
            }
        };

        Self {
            html: html.into(),
            created_at,
            revalidate_after,
            tags: strategy.tags().to_vec(),
            strategy,
        }
    }

    /// Check if the entry is stale at the given instant
    pub fn is_stale_at(&self, now: SystemTime) -> bool {
        match self.revalidate_after {
            Some(deadline) => now > deadline,
            None => false,
        }
    }

    pub fn is_stale(&self) -> bool {
        self.is_stale_at(SystemTime::now())
    }

    /// True if the entry carries any of the given tags
    pub fn has_any_tag(&self, tags: &[String]) -> bool {
        self.tags.iter().any(|tag| tags.contains(tag))
    }
}

/// How a lookup was answered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CacheStatus {
    Hit,
    Miss,
    Stale,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
            CacheStatus::Stale => "STALE",
        }
    }
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Answer of `PageCacheService::get_or_create`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheResult {
    pub html: String,
    pub status: CacheStatus,
    pub strategy: CacheStrategy,
}

/// Output of a render callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub html: String,
    /// Strategy declared by the page; None falls back to the caller's default
    pub strategy: Option<CacheStrategy>,
}

impl Rendered {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            strategy: None,
        }
    }

    pub fn with_strategy(html: impl Into<String>, strategy: CacheStrategy) -> Self {
        Self {
            html: html.into(),
            strategy: Some(strategy),
        }
    }
}

/// Build the cache key for a request: the pathname, plus `?` and the raw
/// query string exactly as received when there is one.
pub fn build_cache_key(pathname: &str, raw_query: Option<&str>) -> String {
    match raw_query {
        Some(query) if !query.is_empty() => format!("{}?{}", pathname, query),
        _ => pathname.to_string(),
    }
}
