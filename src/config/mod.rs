// Configuration module

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::CacheConfig;
use crate::constants::{DEFAULT_EXTENSIONS, DEFAULT_ORIGIN, DEFAULT_PAGES_DIR};
use crate::page::PageLoader;
use crate::router::{RouteTableBuilder, ScanMode};

pub use crate::logging::{LogFormat, LoggingConfig};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub routes: RoutesConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutesConfig {
    /// Directory scanned for page files
    #[serde(default = "default_pages_dir")]
    pub pages_dir: PathBuf,
    /// Origin prefixed to every route key
    #[serde(default = "default_origin")]
    pub origin: String,
    /// File extensions treated as pages, each starting with '.'
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Require static paths for every dynamic page
    #[serde(default)]
    pub build_mode: bool,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            pages_dir: default_pages_dir(),
            origin: default_origin(),
            extensions: default_extensions(),
            build_mode: false,
        }
    }
}

fn default_pages_dir() -> PathBuf {
    PathBuf::from(DEFAULT_PAGES_DIR)
}

fn default_origin() -> String {
    DEFAULT_ORIGIN.to_string()
}

fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect()
}

impl RoutesConfig {
    pub fn scan_mode(&self) -> ScanMode {
        if self.build_mode {
            ScanMode::Build
        } else {
            ScanMode::Serve
        }
    }

    /// Route table builder for this configuration
    pub fn builder(&self, loader: Arc<dyn PageLoader>) -> RouteTableBuilder {
        RouteTableBuilder::new(&self.pages_dir, loader)
            .origin(self.origin.clone())
            .extensions(self.extensions.clone())
            .mode(self.scan_mode())
    }

    /// Validate routing configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.pages_dir.as_os_str().is_empty() {
            return Err("routes.pages_dir cannot be empty".to_string());
        }

        if self.origin.is_empty() {
            return Err("routes.origin cannot be empty".to_string());
        }

        if self.extensions.is_empty() {
            return Err("routes.extensions must list at least one extension".to_string());
        }

        for ext in &self.extensions {
            if !ext.starts_with('.') || ext.len() < 2 {
                return Err(format!(
                    "routes.extensions entry '{}' must start with '.' followed by a name",
                    ext
                ));
            }
        }

        Ok(())
    }
}

impl Config {
    /// Parse YAML, replacing `${VAR_NAME}` with environment variable values.
    /// Fails if a referenced variable is not set.
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        let mut missing = Vec::new();
        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            let var_name = &caps[1];
            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    missing.push(var_name.to_string());
                    String::new()
                }
            }
        });

        if let Some(var_name) = missing.first() {
            return Err(format!(
                "Environment variable '{}' is referenced but not set",
                var_name
            ));
        }

        serde_yaml::from_str(&substituted).map_err(|e| e.to_string())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_yaml_with_env(&yaml)
    }

    pub fn validate(&self) -> Result<(), String> {
        self.routes.validate()?;
        self.cache.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}
