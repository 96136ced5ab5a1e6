//! Cache-Control header generation for page responses.
//!
//! Maps the cache strategy a page was served under to the directives sent to
//! browsers and shared caches:
//! - `no-store`: caching disabled, or a dynamic page
//! - `public, max-age=31536000, immutable`: static pages
//! - `public, max-age=N, stale-while-revalidate=2N`: timed pages
//!
//! # Example
//!
//! ```rust
//! use kagami::cache::{cache_control_header_for, CacheStrategy, HeaderPolicy};
//!
//! let strategy = CacheStrategy::timed(60, &["blog"]);
//! assert_eq!(
//!     cache_control_header_for(HeaderPolicy::Strategy(&strategy)),
//!     "public, max-age=60, stale-while-revalidate=120"
//! );
//! assert_eq!(cache_control_header_for(HeaderPolicy::Disabled), "no-store");
//! ```

use super::entry::{CacheStatus, CacheStrategy};
use crate::constants::STATIC_MAX_AGE_SECONDS;

/// Input of `cache_control_header_for`: a strategy, or caching turned off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderPolicy<'a> {
    Disabled,
    Strategy(&'a CacheStrategy),
}

impl<'a> From<&'a CacheStrategy> for HeaderPolicy<'a> {
    fn from(strategy: &'a CacheStrategy) -> Self {
        HeaderPolicy::Strategy(strategy)
    }
}

/// Cache-Control header value for a page served under `policy`.
///
/// Deterministic and side-effect free.
pub fn cache_control_header_for(policy: HeaderPolicy<'_>) -> String {
    match policy {
        HeaderPolicy::Disabled => "no-store".to_string(),
        HeaderPolicy::Strategy(CacheStrategy::Static) => {
            format!("public, max-age={}, immutable", STATIC_MAX_AGE_SECONDS)
        }
        HeaderPolicy::Strategy(CacheStrategy::Dynamic) => "no-store".to_string(),
        HeaderPolicy::Strategy(CacheStrategy::TimedTags {
            revalidate_seconds, ..
        }) => format!(
            "public, max-age={}, stale-while-revalidate={}",
            revalidate_seconds,
            revalidate_seconds.saturating_mul(2)
        ),
    }
}

/// X-Cache header value: the lookup status, or `DISABLED` when caching is off
pub fn x_cache_header(status: CacheStatus, cache_enabled: bool) -> &'static str {
    if cache_enabled {
        status.as_str()
    } else {
        "DISABLED"
    }
}
