// Render module
//
// Renderers turn a page file plus request props into HTML. They are
// resolved by integration name through the `RendererRegistry`; the page
// cache never renders anything itself.

use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::constants::DEFAULT_INTEGRATION;
use crate::router::{Params, Query};

/// Props handed to a page at render time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageProps {
    pub params: Params,
    pub query: Query,
}

/// Request context for a render
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Request URL as received
    pub url: String,
    /// Cache key the output will be stored under
    pub cache_key: String,
    pub request_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("no renderer registered for integration '{0}'")]
    UnknownIntegration(String),

    #[error("failed to read page '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("render failed: {0}")]
    Failed(String),
}

/// A rendering integration
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Render the page file `view` to HTML
    async fn render_to_response(
        &self,
        view: &Path,
        props: &PageProps,
        options: &RenderOptions,
    ) -> Result<String, RenderError>;
}

/// Renderers keyed by integration name
#[derive(Clone, Default)]
pub struct RendererRegistry {
    renderers: HashMap<String, Arc<dyn Renderer>>,
}

impl RendererRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `html` integration
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(DEFAULT_INTEGRATION, Arc::new(TemplateRenderer::new()));
        registry
    }

    /// Register a renderer, replacing any previous one with the same name
    pub fn register(&mut self, integration: impl Into<String>, renderer: Arc<dyn Renderer>) {
        self.renderers.insert(integration.into(), renderer);
    }

    pub fn get(&self, integration: &str) -> Result<Arc<dyn Renderer>, RenderError> {
        self.renderers
            .get(integration)
            .cloned()
            .ok_or_else(|| RenderError::UnknownIntegration(integration.to_string()))
    }

    pub fn integrations(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.renderers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Renders page files as HTML templates.
///
/// `{{ params.name }}` and `{{ query.name }}` placeholders are replaced with
/// the HTML-escaped request value; rest params are joined with `/`. Unknown
/// names render as the empty string.
pub struct TemplateRenderer {
    placeholder: Regex,
}

impl TemplateRenderer {
    pub fn new() -> Self {
        Self {
            placeholder: Regex::new(r"\{\{\s*(params|query)\.([A-Za-z0-9_]+)\s*\}\}")
                .expect("placeholder pattern is a valid regex"),
        }
    }

    /// Substitute placeholders in `template`
    pub fn render_template(&self, template: &str, props: &PageProps) -> String {
        self.placeholder
            .replace_all(template, |caps: &regex::Captures| {
                let name = &caps[2];
                let value = match &caps[1] {
                    "params" => props.params.get(name).map(|value| value.to_path_segment()),
                    _ => props.query.get(name).cloned(),
                };
                escape_html(&value.unwrap_or_default())
            })
            .into_owned()
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Renderer for TemplateRenderer {
    async fn render_to_response(
        &self,
        view: &Path,
        props: &PageProps,
        _options: &RenderOptions,
    ) -> Result<String, RenderError> {
        let template = tokio::fs::read_to_string(view)
            .await
            .map_err(|source| RenderError::Read {
                path: view.to_path_buf(),
                source,
            })?;
        Ok(self.render_template(&template, props))
    }
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::ParamValue;
    use tempfile::TempDir;

    fn props() -> PageProps {
        let mut props = PageProps::default();
        props.params.insert("slug".to_string(), ParamValue::from("hello"));
        props.params.insert("path".to_string(), ParamValue::from(vec!["a", "b"]));
        props.query.insert("q".to_string(), "<x>".to_string());
        props
    }

    #[test]
    fn test_template_substitutes_params_and_query() {
        let renderer = TemplateRenderer::new();
        let html = renderer.render_template(
            "<h1>{{ params.slug }}</h1><p>{{params.path}}</p><i>{{ query.q }}</i>",
            &props(),
        );
        assert_eq!(html, "<h1>hello</h1><p>a/b</p><i>&lt;x&gt;</i>");
    }

    #[test]
    fn test_template_unknown_placeholder_renders_empty() {
        let renderer = TemplateRenderer::new();
        assert_eq!(renderer.render_template("[{{ params.nope }}]", &props()), "[]");
    }

    #[test]
    fn test_registry_resolves_by_integration_name() {
        let registry = RendererRegistry::with_defaults();
        assert!(registry.get("html").is_ok());
        assert!(matches!(
            registry.get("svelte"),
            Err(RenderError::UnknownIntegration(name)) if name == "svelte"
        ));
        assert_eq!(registry.integrations(), vec!["html"]);
    }

    #[tokio::test]
    async fn test_template_renderer_reads_page_file() {
        let dir = TempDir::new().unwrap();
        let page = dir.path().join("[slug].html");
        std::fs::write(&page, "<h1>{{ params.slug }}</h1>").unwrap();

        let html = TemplateRenderer::new()
            .render_to_response(&page, &props(), &RenderOptions::default())
            .await
            .unwrap();
        assert_eq!(html, "<h1>hello</h1>");
    }

    #[tokio::test]
    async fn test_template_renderer_missing_file_is_read_error() {
        let dir = TempDir::new().unwrap();
        let result = TemplateRenderer::new()
            .render_to_response(&dir.path().join("gone.html"), &props(), &RenderOptions::default())
            .await;
        assert!(matches!(result, Err(RenderError::Read { .. })));
    }
}
