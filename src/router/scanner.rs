//! Route table builder
//!
//! Walks the pages directory and turns every file with a routable extension
//! into one or more `RouteDescriptor`s. Files are visited in sorted order so
//! the resulting table order, and therefore match precedence within a pass,
//! is deterministic.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use walkdir::WalkDir;

use super::error::RouteError;
use super::route::{RouteDescriptor, RouteKind, RouteTable};
use crate::constants::{DEFAULT_EXTENSIONS, DEFAULT_ORIGIN};
use crate::page::PageLoader;

/// Whether the table is built for a static build or for serving
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanMode {
    /// Every dynamic route must be enumerable; only concrete routes are kept
    Build,
    /// Dynamic patterns stay routable at request time
    #[default]
    Serve,
}

/// Builds a `RouteTable` from a pages directory
pub struct RouteTableBuilder {
    pages_dir: PathBuf,
    origin: String,
    extensions: Vec<String>,
    mode: ScanMode,
    loader: Arc<dyn PageLoader>,
}

impl RouteTableBuilder {
    pub fn new(pages_dir: impl Into<PathBuf>, loader: Arc<dyn PageLoader>) -> Self {
        Self {
            pages_dir: pages_dir.into(),
            origin: DEFAULT_ORIGIN.to_string(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
            mode: ScanMode::default(),
            loader,
        }
    }

    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn mode(mut self, mode: ScanMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn pages_dir(&self) -> &Path {
        &self.pages_dir
    }

    /// Scan the pages directory and build a fresh route table.
    ///
    /// In build mode a dynamic page without a static-path enumerator is an
    /// error, as is an enumerator that fails or returns a path missing a
    /// parameter. In serve mode these are logged, bad paths are skipped and
    /// the pattern route is registered.
    pub async fn build(&self) -> Result<RouteTable, RouteError> {
        let start = Instant::now();

        if !self.pages_dir.is_dir() {
            return Err(RouteError::InvalidPagesDir(self.pages_dir.clone()));
        }

        let mut table = RouteTable::new();
        for file_path in self.page_files()? {
            let Some(pathname) = self.pathname_for(&file_path) else {
                continue;
            };
            self.register(&mut table, file_path, pathname).await?;
        }

        tracing::info!(
            pages_dir = %self.pages_dir.display(),
            routes = table.len(),
            mode = ?self.mode,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Route table built"
        );

        Ok(table)
    }

    async fn register(&self, table: &mut RouteTable, file_path: PathBuf, pathname: String) -> Result<(), RouteError> {
        let kind = RouteKind::classify(&pathname);

        match kind {
            RouteKind::Exact => {
                table.insert(self.route_key(&pathname), RouteDescriptor::new(kind, file_path, pathname));
            }
            RouteKind::CatchAll => {
                if self.mode == ScanMode::Build {
                    tracing::warn!(
                        pattern = %pathname,
                        file = %file_path.display(),
                        "Catch-all routes are not supported for static generation"
                    );
                } else {
                    tracing::debug!(pattern = %pathname, "Registered catch-all route");
                }
                table.insert(self.route_key(&pathname), RouteDescriptor::new(kind, file_path, pathname));
            }
            RouteKind::Dynamic => {
                let resolved = self.pre_resolve(table, &file_path, &pathname).await?;
                // Build output only contains enumerated pages; serving keeps
                // the pattern for parameters outside the enumeration.
                if self.mode == ScanMode::Serve || !resolved {
                    table.insert(self.route_key(&pathname), RouteDescriptor::new(kind, file_path, pathname));
                }
            }
        }
        Ok(())
    }

    /// Register one concrete route per static path. Returns true when the
    /// page has an enumerator that succeeded.
    async fn pre_resolve(&self, table: &mut RouteTable, file_path: &Path, pattern: &str) -> Result<bool, RouteError> {
        let module = self.loader.load(file_path).await?;
        let enumerated = match &module {
            Some(module) => module.static_paths().await,
            None => None,
        };

        let static_paths = match (enumerated, self.mode) {
            (Some(Ok(paths)), _) => paths,
            (Some(Err(e)), ScanMode::Build) => return Err(e),
            (Some(Err(e)), ScanMode::Serve) => {
                tracing::warn!(
                    pattern = %pattern,
                    file = %file_path.display(),
                    error = %e,
                    "Static paths failed, serving pattern route only"
                );
                return Ok(false);
            }
            (None, ScanMode::Build) => {
                return Err(RouteError::MissingStaticPaths {
                    file: file_path.to_path_buf(),
                    pattern: pattern.to_string(),
                })
            }
            (None, ScanMode::Serve) => return Ok(false),
        };

        for static_path in static_paths {
            let concrete = match (static_path.resolve(pattern), self.mode) {
                (Ok(concrete), _) => concrete,
                (Err(message), ScanMode::Build) => {
                    return Err(RouteError::StaticPaths {
                        file: file_path.to_path_buf(),
                        message,
                    })
                }
                (Err(message), ScanMode::Serve) => {
                    tracing::warn!(
                        pattern = %pattern,
                        file = %file_path.display(),
                        error = %message,
                        "Skipping static path that does not fit the pattern"
                    );
                    continue;
                }
            };
            table.insert(
                self.route_key(&concrete),
                RouteDescriptor::pre_resolved(file_path, concrete, static_path.params),
            );
        }
        Ok(true)
    }

    fn page_files(&self) -> Result<Vec<PathBuf>, RouteError> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.pages_dir).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_file() && self.has_page_extension(entry.path()) {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }

    fn has_page_extension(&self, path: &Path) -> bool {
        let name = path.file_name().and_then(|name| name.to_str()).unwrap_or_default();
        self.extensions.iter().any(|ext| name.ends_with(ext.as_str()) && name.len() > ext.len())
    }

    /// Route pattern for a page file: path relative to the pages directory,
    /// extension and trailing `index` removed, with a leading `/`.
    fn pathname_for(&self, file_path: &Path) -> Option<String> {
        let relative = file_path.strip_prefix(&self.pages_dir).ok()?;
        let relative = relative.to_str()?.replace('\\', "/");

        let without_ext = self
            .extensions
            .iter()
            .find_map(|ext| relative.strip_suffix(ext.as_str()))?;

        let route = if without_ext == "index" {
            ""
        } else {
            without_ext.strip_suffix("/index").unwrap_or(without_ext)
        };

        Some(format!("/{}", route))
    }

    fn route_key(&self, pathname: &str) -> String {
        format!("{}{}", self.origin.trim_end_matches('/'), pathname)
    }
}
