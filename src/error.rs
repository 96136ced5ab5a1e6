// Error types module

use crate::cache::CacheError;
use crate::logging::LoggingError;
use crate::pipeline::PipelineError;
use crate::render::RenderError;
use crate::router::RouteError;

/// Top-level error type
///
/// Wraps the per-module errors so the binary can report them uniformly and
/// pick an exit code by category.
#[derive(Debug, thiserror::Error)]
pub enum KagamiError {
    /// Configuration errors (invalid YAML, missing env vars, failed validation)
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Routing error: {0}")]
    Route(#[from] RouteError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl KagamiError {
    /// Process exit code for this error
    ///
    /// 2 for configuration problems (including pages that cannot be
    /// statically generated), 1 for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            KagamiError::Config(_) => 2,
            KagamiError::Route(e) if e.is_configuration_error() => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_config_error_display() {
        let err = KagamiError::Config("routes.origin cannot be empty".to_string());
        assert_eq!(err.to_string(), "Configuration error: routes.origin cannot be empty");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_missing_static_paths_is_configuration_exit_code() {
        let err: KagamiError = RouteError::MissingStaticPaths {
            file: PathBuf::from("src/pages/blog/[slug].html"),
            pattern: "/blog/[slug]".to_string(),
        }
        .into();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("[slug].html"));
    }

    #[test]
    fn test_render_error_converts() {
        let err: KagamiError = RenderError::Failed("boom".to_string()).into();
        assert!(matches!(err, KagamiError::Render(_)));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_io_error_converts() {
        let err: KagamiError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(err.to_string().starts_with("I/O error"));
    }
}
