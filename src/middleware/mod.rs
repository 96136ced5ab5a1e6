//! Per-page request middleware.
//!
//! A page names its middleware in its metadata (`"middleware": ["auth", ...]`).
//! The pipeline resolves the names through a `MiddlewareRegistry` and runs
//! them in the listed order before the page cache is consulted. Each
//! middleware either lets the request continue or answers it outright, in
//! which case later middleware, the cache and the renderer are skipped.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::pipeline::{PageResponse, RequestContext};
use crate::router::MatchResult;

/// Outcome of running one middleware
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiddlewareOutcome {
    /// Continue with the next middleware, then the page.
    Continue,
    /// Short-circuit with this response.
    Respond(PageResponse),
}

impl MiddlewareOutcome {
    pub fn continue_processing() -> Self {
        MiddlewareOutcome::Continue
    }

    pub fn respond(response: PageResponse) -> Self {
        MiddlewareOutcome::Respond(response)
    }

    pub fn should_continue(&self) -> bool {
        matches!(self, MiddlewareOutcome::Continue)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MiddlewareError {
    #[error("no middleware registered under '{0}'")]
    Unknown(String),

    #[error("middleware '{name}' failed: {message}")]
    Failed { name: String, message: String },
}

/// Request middleware run for the pages that list it
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, ctx: &RequestContext, matched: &MatchResult) -> Result<MiddlewareOutcome, MiddlewareError>;
}

/// Middleware resolved for one page, in run order
pub struct MiddlewareChain {
    entries: Vec<(String, Arc<dyn Middleware>)>,
}

impl MiddlewareChain {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Run every middleware in order.
    ///
    /// Returns the response of the first middleware that short-circuits, or
    /// None when all of them let the request continue.
    pub async fn run(
        &self,
        ctx: &RequestContext,
        matched: &MatchResult,
    ) -> Result<Option<PageResponse>, MiddlewareError> {
        for (name, middleware) in &self.entries {
            match middleware.handle(ctx, matched).await? {
                MiddlewareOutcome::Continue => {}
                MiddlewareOutcome::Respond(response) => {
                    tracing::debug!(middleware = %name, status = response.status, "Middleware answered request");
                    return Ok(Some(response));
                }
            }
        }
        Ok(None)
    }
}

/// Middleware keyed by name
#[derive(Clone, Default)]
pub struct MiddlewareRegistry {
    middleware: HashMap<String, Arc<dyn Middleware>>,
}

impl MiddlewareRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a middleware, replacing any previous one with the same name
    pub fn register(&mut self, name: impl Into<String>, middleware: Arc<dyn Middleware>) {
        self.middleware.insert(name.into(), middleware);
    }

    pub fn with(mut self, name: impl Into<String>, middleware: impl Middleware + 'static) -> Self {
        self.register(name, Arc::new(middleware));
        self
    }

    /// Resolve a page's middleware names. Fails on the first unknown name
    /// before anything runs.
    pub fn resolve(&self, names: &[String]) -> Result<MiddlewareChain, MiddlewareError> {
        let entries = names
            .iter()
            .map(|name| {
                self.middleware
                    .get(name)
                    .map(|middleware| (name.clone(), middleware.clone()))
                    .ok_or_else(|| MiddlewareError::Unknown(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(MiddlewareChain { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::{Query, RouteKind};
    use parking_lot::Mutex;
    use std::path::PathBuf;

    fn matched() -> MatchResult {
        MatchResult {
            file_path: PathBuf::from("pages/account.html"),
            kind: RouteKind::Exact,
            pathname: "/account".to_string(),
            query: Query::new(),
            params: None,
        }
    }

    struct Recording {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        answer: Option<u16>,
    }

    #[async_trait]
    impl Middleware for Recording {
        async fn handle(&self, _ctx: &RequestContext, _matched: &MatchResult) -> Result<MiddlewareOutcome, MiddlewareError> {
            self.log.lock().push(self.name);
            Ok(match self.answer {
                Some(status) => MiddlewareOutcome::respond(PageResponse::new(status, self.name)),
                None => MiddlewareOutcome::continue_processing(),
            })
        }
    }

    fn registry(log: &Arc<Mutex<Vec<&'static str>>>) -> MiddlewareRegistry {
        let step = |name, answer| Recording {
            name,
            log: log.clone(),
            answer,
        };
        MiddlewareRegistry::new()
            .with("first", step("first", None))
            .with("second", step("second", None))
            .with("deny", step("deny", Some(403)))
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|name| name.to_string()).collect()
    }

    #[tokio::test]
    async fn test_chain_runs_in_listed_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = registry(&log).resolve(&names(&["second", "first"])).unwrap();

        let response = chain.run(&RequestContext::new("/account"), &matched()).await.unwrap();

        assert!(response.is_none());
        assert_eq!(*log.lock(), vec!["second", "first"]);
    }

    #[tokio::test]
    async fn test_chain_stops_at_first_response() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = registry(&log).resolve(&names(&["first", "deny", "second"])).unwrap();

        let response = chain
            .run(&RequestContext::new("/account"), &matched())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(response.status, 403);
        assert_eq!(response.body, "deny");
        assert_eq!(*log.lock(), vec!["first", "deny"]);
    }

    #[test]
    fn test_unknown_name_fails_resolution() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let result = registry(&log).resolve(&names(&["first", "geo"]));

        assert!(matches!(result, Err(MiddlewareError::Unknown(ref name)) if name == "geo"));
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_empty_list_resolves_to_empty_chain() {
        let chain = MiddlewareRegistry::new().resolve(&[]).unwrap();
        assert!(chain.is_empty());
        assert_eq!(chain.len(), 0);
    }

    #[test]
    fn test_outcome_helpers() {
        assert!(MiddlewareOutcome::continue_processing().should_continue());
        assert!(!MiddlewareOutcome::respond(PageResponse::new(401, "")).should_continue());
    }
}
