// Request pipeline module - turns a request URL into a page response
//
// match route -> load page module -> page middleware -> build cache key
// -> page cache (rendering through the page's integration on miss/stale)
// -> headers

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::Instrument;
use uuid::Uuid;

use crate::cache::{
    build_cache_key, cache_control_header_for, x_cache_header, CacheResult, CacheStrategy, HeaderPolicy,
    PageCacheService, Rendered,
};
use crate::logging::create_request_span;
use crate::metrics::Metrics;
use crate::middleware::{MiddlewareError, MiddlewareRegistry};
use crate::page::{PageLoader, PageMetadata};
use crate::render::{PageProps, RenderError, RenderOptions, RendererRegistry};
use crate::router::{split_url, RouteError, Router};

/// Per-request context
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
    url: String,
    timestamp: u64,
}

impl RequestContext {
    /// Create a new RequestContext for a request URL
    /// Automatically generates a unique request ID (UUID v4) and captures current timestamp
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            url: url.into(),
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_secs())
                .unwrap_or(0),
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get the request timestamp (Unix epoch seconds)
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }
}

/// A rendered page ready to be written to the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl PageResponse {
    /// Response with a body and no headers
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Middleware(#[from] MiddlewareError),
}

pub struct PagePipeline {
    router: Arc<Router>,
    loader: Arc<dyn PageLoader>,
    renderers: Arc<RendererRegistry>,
    middleware: Arc<MiddlewareRegistry>,
    cache: PageCacheService,
    default_strategy: CacheStrategy,
    metrics: Option<Arc<Metrics>>,
}

impl PagePipeline {
    pub fn new(
        router: Arc<Router>,
        loader: Arc<dyn PageLoader>,
        renderers: Arc<RendererRegistry>,
        cache: PageCacheService,
        default_strategy: CacheStrategy,
    ) -> Self {
        Self {
            router,
            loader,
            renderers,
            middleware: Arc::new(MiddlewareRegistry::new()),
            cache,
            default_strategy,
            metrics: None,
        }
    }

    /// Middleware that pages can list by name
    pub fn with_middleware(mut self, middleware: Arc<MiddlewareRegistry>) -> Self {
        self.middleware = middleware;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn cache(&self) -> &PageCacheService {
        &self.cache
    }

    /// Handle a request URL.
    ///
    /// Returns `Ok(None)` when no route matches; the caller answers 404.
    pub async fn handle(&self, url: &str) -> Result<Option<PageResponse>, PipelineError> {
        let ctx = RequestContext::new(url);
        let span = create_request_span(ctx.url(), ctx.request_id());
        self.handle_with_context(ctx).instrument(span).await
    }

    async fn handle_with_context(&self, ctx: RequestContext) -> Result<Option<PageResponse>, PipelineError> {
        tracing::debug!(timestamp = ctx.timestamp(), "Handling page request");

        let Some(matched) = self.router.match_url(ctx.url()) else {
            tracing::debug!("No route matched");
            return Ok(None);
        };
        tracing::debug!(pattern = %matched.pathname, kind = %matched.kind, "Route matched");

        let metadata = match self.loader.load(&matched.file_path).await? {
            Some(module) => module.metadata(),
            None => PageMetadata::default(),
        };

        let chain = self.middleware.resolve(&metadata.middleware)?;
        if !chain.is_empty() {
            tracing::debug!(middleware = chain.len(), "Running page middleware");
            if let Some(mut response) = chain.run(&ctx, &matched).await? {
                if response.header("X-Request-Id").is_none() {
                    response
                        .headers
                        .push(("X-Request-Id".to_string(), ctx.request_id().to_string()));
                }
                return Ok(Some(response));
            }
        }

        let renderer = self.renderers.get(&metadata.integration)?;

        let (pathname, raw_query) = split_url(ctx.url());
        let cache_key = build_cache_key(pathname, raw_query);

        let render = {
            let file_path: PathBuf = matched.file_path.clone();
            let props = PageProps {
                params: matched.params.clone().unwrap_or_default(),
                query: matched.query.clone(),
            };
            let options = RenderOptions {
                url: ctx.url().to_string(),
                cache_key: cache_key.clone(),
                request_id: ctx.request_id().to_string(),
            };
            let page_strategy = metadata.cache.clone();
            let integration = metadata.integration.clone();
            let metrics = self.metrics.clone();

            move || async move {
                let start = Instant::now();
                let html = renderer.render_to_response(&file_path, &props, &options).await?;
                if let Some(metrics) = &metrics {
                    metrics.increment_render_count(&integration);
                    metrics.record_render_duration(start.elapsed().as_secs_f64() * 1000.0);
                }
                Ok::<_, RenderError>(Rendered {
                    html,
                    strategy: page_strategy,
                })
            }
        };

        let result = self
            .cache
            .get_or_create(&cache_key, &self.default_strategy, render)
            .await?;

        Ok(Some(self.response(&ctx, result)))
    }

    fn response(&self, ctx: &RequestContext, result: CacheResult) -> PageResponse {
        let enabled = self.cache.is_enabled();
        let policy = if enabled {
            HeaderPolicy::Strategy(&result.strategy)
        } else {
            HeaderPolicy::Disabled
        };

        PageResponse {
            status: 200,
            headers: vec![
                ("Content-Type".to_string(), "text/html; charset=utf-8".to_string()),
                ("Cache-Control".to_string(), cache_control_header_for(policy)),
                ("X-Cache".to_string(), x_cache_header(result.status, enabled).to_string()),
                ("X-Request-Id".to_string(), ctx.request_id().to_string()),
            ],
            body: result.html,
        }
    }
}
