// Cache module

pub mod control;
pub mod entry;
pub mod error;
pub mod memory;
pub mod service;
pub mod stats;
pub mod traits;

pub use control::{cache_control_header_for, x_cache_header, HeaderPolicy};
pub use entry::{build_cache_key, CacheEntry, CacheResult, CacheStatus, CacheStrategy, Rendered};
pub use error::CacheError;
pub use memory::{MemoryStore, NullStore};
pub use service::PageCacheService;
pub use stats::StoreStats;
pub use traits::CacheStore;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::constants::{DEFAULT_MAX_ENTRIES, DEFAULT_REVALIDATE_SECONDS};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
    /// Strategy for pages that do not declare one
    #[serde(default = "default_strategy")]
    pub default_strategy: CacheStrategy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_entries: default_max_entries(),
            default_strategy: default_strategy(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_max_entries() -> u64 {
    DEFAULT_MAX_ENTRIES
}

fn default_strategy() -> CacheStrategy {
    CacheStrategy::TimedTags {
        revalidate_seconds: DEFAULT_REVALIDATE_SECONDS,
        tags: Vec::new(),
    }
}

impl CacheConfig {
    /// Validate cache configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_entries == 0 {
            return Err("cache.max_entries must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Build the page cache service described by this configuration
    pub fn build_service(&self) -> PageCacheService {
        let store: Arc<dyn CacheStore> = if self.enabled {
            Arc::new(MemoryStore::new(self.max_entries))
        } else {
            Arc::new(NullStore)
        };
        PageCacheService::new(store, self.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_config_defaults() {
        let config: CacheConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.enabled);
        assert_eq!(config.max_entries, 1000);
        assert_eq!(config.default_strategy, CacheStrategy::timed(60, &[]));
    }

    #[test]
    fn test_can_parse_full_cache_config() {
        let yaml = r#"
enabled: false
max_entries: 50
default_strategy:
  type: static
"#;
        let config: CacheConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(!config.enabled);
        assert_eq!(config.max_entries, 50);
        assert_eq!(config.default_strategy, CacheStrategy::Static);
    }

    #[test]
    fn test_rejects_zero_max_entries() {
        let config = CacheConfig {
            max_entries: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.contains("max_entries"));
        assert!(CacheConfig::default().validate().is_ok());
    }

    #[test]
    fn test_build_service_respects_enabled_flag() {
        assert!(CacheConfig::default().build_service().is_enabled());

        let disabled = CacheConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(!disabled.build_service().is_enabled());
    }
}
