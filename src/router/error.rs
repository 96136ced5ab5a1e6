//! Error types for route table construction

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RouteError {
    #[error("pages directory '{}' does not exist or is not a directory", .0.display())]
    InvalidPagesDir(PathBuf),

    #[error("failed to scan pages directory: {0}")]
    Scan(#[from] walkdir::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A dynamic page was found in build mode without a static-path enumerator
    #[error("dynamic route '{pattern}' ({}) must export static paths when building", file.display())]
    MissingStaticPaths { file: PathBuf, pattern: String },

    #[error("static paths for '{}' are invalid: {message}", file.display())]
    StaticPaths { file: PathBuf, message: String },

    #[error("failed to load page module '{}': {message}", file.display())]
    Load { file: PathBuf, message: String },
}

impl RouteError {
    /// True for errors caused by page configuration rather than the environment
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            RouteError::MissingStaticPaths { .. } | RouteError::StaticPaths { .. }
        )
    }
}
