// Constants module - centralized default values for configuration
//
// This module defines the default values used throughout the codebase.

// =============================================================================
// Routing defaults
// =============================================================================

/// Default directory scanned for page files
pub const DEFAULT_PAGES_DIR: &str = "src/pages";

/// Default origin prefixed to route keys
pub const DEFAULT_ORIGIN: &str = "http://localhost:4321";

/// Default page file extensions
pub const DEFAULT_EXTENSIONS: &[&str] = &[".astro", ".md", ".html"];

/// Sidecar file holding a page's static paths
pub const PATHS_SIDECAR_SUFFIX: &str = ".paths.json";

/// Sidecar file holding a page's metadata
pub const META_SIDECAR_SUFFIX: &str = ".meta.json";

/// Integration used when a page does not name one
pub const DEFAULT_INTEGRATION: &str = "html";

// =============================================================================
// Cache defaults
// =============================================================================

/// Default maximum number of cached pages
pub const DEFAULT_MAX_ENTRIES: u64 = 1000;

/// Default revalidation interval for the default timed strategy
pub const DEFAULT_REVALIDATE_SECONDS: u64 = 60;

/// max-age sent for static pages (one year)
pub const STATIC_MAX_AGE_SECONDS: u64 = 31_536_000;

// =============================================================================
// Logging defaults
// =============================================================================

/// Default log level
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default log output format
pub const DEFAULT_LOG_FORMAT: &str = "pretty";

// =============================================================================
// Admin endpoints
// =============================================================================

/// Path of the revalidation endpoint
pub const REVALIDATE_PATH: &str = "/api/revalidate";

/// Path of the cache statistics endpoint
pub const CACHE_STATS_PATH: &str = "/api/cache-stats";
