// Page module contract
//
// A page file may export a static-path enumerator and page metadata (which
// integration renders it, which cache strategy applies, which middleware
// runs before it). Page files are not
// Rust code, so the calling layer supplies a `PageLoader` that resolves a
// file path to a `PageModule`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::CacheStrategy;
use crate::constants::{DEFAULT_INTEGRATION, META_SIDECAR_SUFFIX, PATHS_SIDECAR_SUFFIX};
use crate::router::RouteError;
use crate::router::{Params, SegmentParam};

/// One parameter set produced by a static-path enumerator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticPath {
    #[serde(default)]
    pub params: Params,
}

impl StaticPath {
    pub fn new(params: Params) -> Self {
        Self { params }
    }

    /// Substitute the params into a route pattern to get a concrete pathname.
    ///
    /// `[name]` takes the single value, `[...name]` takes all values joined
    /// with `/` (an empty rest value drops the segment). Every parameter
    /// named by the pattern must be present.
    pub fn resolve(&self, pattern: &str) -> Result<String, String> {
        let mut segments = Vec::new();
        for segment in pattern.split('/').filter(|segment| !segment.is_empty()) {
            match SegmentParam::parse(segment) {
                Some(SegmentParam::Single(name)) | Some(SegmentParam::Rest(name)) => {
                    let value = self
                        .params
                        .get(name)
                        .ok_or_else(|| format!("missing param '{}'", name))?
                        .to_path_segment();
                    if !value.is_empty() {
                        segments.push(value);
                    }
                }
                None => segments.push(segment.to_string()),
            }
        }
        Ok(format!("/{}", segments.join("/")))
    }
}

/// Per-page metadata read by the calling layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    /// Name of the renderer integration for this page
    #[serde(default = "default_integration")]
    pub integration: String,

    /// Cache strategy override; None falls back to the configured default
    #[serde(default)]
    pub cache: Option<CacheStrategy>,

    /// Names of request middleware to run, in order, before the page
    #[serde(default)]
    pub middleware: Vec<String>,
}

fn default_integration() -> String {
    DEFAULT_INTEGRATION.to_string()
}

impl Default for PageMetadata {
    fn default() -> Self {
        Self {
            integration: default_integration(),
            cache: None,
            middleware: Vec::new(),
        }
    }
}

/// What a page file exports
#[async_trait]
pub trait PageModule: Send + Sync {
    /// Static-path enumerator. None when the page does not export one.
    async fn static_paths(&self) -> Option<Result<Vec<StaticPath>, RouteError>> {
        None
    }

    fn metadata(&self) -> PageMetadata {
        PageMetadata::default()
    }
}

/// Resolves page files to their modules
#[async_trait]
pub trait PageLoader: Send + Sync {
    /// Load the module for a page file. Ok(None) when the file exports nothing.
    async fn load(&self, file_path: &Path) -> Result<Option<Arc<dyn PageModule>>, RouteError>;
}

/// A page module described by plain data
#[derive(Debug, Clone, Default)]
pub struct PageDefinition {
    pub static_paths: Option<Vec<StaticPath>>,
    pub metadata: PageMetadata,
}

impl PageDefinition {
    pub fn new(metadata: PageMetadata) -> Self {
        Self {
            static_paths: None,
            metadata,
        }
    }

    pub fn with_static_paths(mut self, paths: Vec<StaticPath>) -> Self {
        self.static_paths = Some(paths);
        self
    }
}

#[async_trait]
impl PageModule for PageDefinition {
    async fn static_paths(&self) -> Option<Result<Vec<StaticPath>, RouteError>> {
        self.static_paths.clone().map(Ok)
    }

    fn metadata(&self) -> PageMetadata {
        self.metadata.clone()
    }
}

/// In-memory loader keyed by file path
#[derive(Default, Clone)]
pub struct MapPageLoader {
    modules: HashMap<PathBuf, Arc<dyn PageModule>>,
}

impl MapPageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, file_path: impl Into<PathBuf>, module: Arc<dyn PageModule>) {
        self.modules.insert(file_path.into(), module);
    }

    pub fn with(mut self, file_path: impl Into<PathBuf>, module: impl PageModule + 'static) -> Self {
        self.insert(file_path, Arc::new(module));
        self
    }
}

#[async_trait]
impl PageLoader for MapPageLoader {
    async fn load(&self, file_path: &Path) -> Result<Option<Arc<dyn PageModule>>, RouteError> {
        Ok(self.modules.get(file_path).cloned())
    }
}

/// Loader that reads JSON sidecar files next to each page
///
/// - `<page>.paths.json`: array of `{ "params": { ... } }` (static-path enumerator)
/// - `<page>.meta.json`: `{ "integration": "...", "cache": { ... }, "middleware": [...] }`
///
/// A page without sidecars loads as a module with default metadata and no
/// enumerator.
#[derive(Debug, Clone, Default)]
pub struct SidecarPageLoader;

impl SidecarPageLoader {
    pub fn new() -> Self {
        Self
    }

    fn sidecar(file_path: &Path, suffix: &str) -> PathBuf {
        let mut name = file_path.as_os_str().to_os_string();
        name.push(suffix);
        PathBuf::from(name)
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        file_path: &Path,
        suffix: &str,
    ) -> Result<Option<T>, RouteError> {
        let path = Self::sidecar(file_path, suffix);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(RouteError::Io(e)),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| RouteError::Load {
                file: path,
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl PageLoader for SidecarPageLoader {
    async fn load(&self, file_path: &Path) -> Result<Option<Arc<dyn PageModule>>, RouteError> {
        let static_paths: Option<Vec<StaticPath>> =
            Self::read_json(file_path, PATHS_SIDECAR_SUFFIX).await?;
        let metadata: Option<PageMetadata> = Self::read_json(file_path, META_SIDECAR_SUFFIX).await?;

        Ok(Some(Arc::new(PageDefinition {
            static_paths,
            metadata: metadata.unwrap_or_default(),
        })))
    }
}
