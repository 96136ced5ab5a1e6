// Router module
//
// Owns the current route table. Readers load a snapshot without locking;
// `reload()` rescans the pages directory and swaps in a complete new table,
// then notifies the registered reload callback.

pub mod error;
pub mod matcher;
pub mod route;
pub mod scanner;

pub use error::RouteError;
pub use matcher::{get_dynamic_params, match_route, parse_query, split_url};
pub use route::{MatchResult, ParamValue, Params, Query, RouteDescriptor, RouteKind, RouteTable, SegmentParam};
pub use scanner::{RouteTableBuilder, ScanMode};

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::metrics::Metrics;

type ReloadCallback = Box<dyn Fn() + Send + Sync>;

pub struct Router {
    builder: RouteTableBuilder,
    table: ArcSwap<RouteTable>,
    on_reload: Mutex<Option<ReloadCallback>>,
    metrics: Option<Arc<Metrics>>,
}

impl Router {
    /// Create a router by building the initial table
    pub async fn new(builder: RouteTableBuilder) -> Result<Self, RouteError> {
        let table = builder.build().await?;
        Ok(Self::with_table(builder, table))
    }

    /// Create a router around an already built table
    pub fn with_table(builder: RouteTableBuilder, table: RouteTable) -> Self {
        Self {
            builder,
            table: ArcSwap::from_pointee(table),
            on_reload: Mutex::new(None),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Register the callback invoked after every successful reload.
    /// Replaces any previously registered callback.
    pub fn on_reload<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.on_reload.lock() = Some(Box::new(callback));
    }

    /// Current table snapshot
    pub fn table(&self) -> Arc<RouteTable> {
        self.table.load_full()
    }

    /// Match a request URL against the current table
    pub fn match_url(&self, url: &str) -> Option<MatchResult> {
        let table = self.table.load();
        let result = match_route(&table, url);

        if let Some(metrics) = &self.metrics {
            if result.is_some() {
                metrics.increment_route_match();
            } else {
                metrics.increment_route_no_match();
            }
        }

        result
    }

    /// Rebuild the table from disk and replace it atomically.
    ///
    /// On error the current table stays in place and the callback is not
    /// invoked.
    pub async fn reload(&self) -> Result<(), RouteError> {
        let table = self.builder.build().await?;
        let routes = table.len();
        self.table.store(Arc::new(table));

        if let Some(metrics) = &self.metrics {
            metrics.increment_router_reload();
        }
        tracing::info!(routes = routes, "Router reloaded");

        if let Some(callback) = self.on_reload.lock().as_ref() {
            callback();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::MapPageLoader;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn builder(dir: &std::path::Path) -> RouteTableBuilder {
        RouteTableBuilder::new(dir, Arc::new(MapPageLoader::new())).extensions([".html"])
    }

    #[tokio::test]
    async fn test_router_matches_initial_table() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("about.html"), "about").unwrap();

        let router = Router::new(builder(dir.path())).await.unwrap();
        let result = router.match_url("/about").unwrap();
        assert_eq!(result.kind, RouteKind::Exact);
        assert!(router.match_url("/missing").is_none());
    }

    #[tokio::test]
    async fn test_reload_replaces_table_and_invokes_callback() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("about.html"), "about").unwrap();

        let router = Router::new(builder(dir.path())).await.unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        router.on_reload(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let before = router.table();
        std::fs::write(dir.path().join("contact.html"), "contact").unwrap();
        router.reload().await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(router.match_url("/contact").is_some());
        // Old snapshots are unaffected by the swap
        assert_eq!(before.len(), 1);
        assert_eq!(router.table().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_current_table() {
        let dir = TempDir::new().unwrap();
        let pages = dir.path().join("pages");
        std::fs::create_dir(&pages).unwrap();
        std::fs::write(pages.join("about.html"), "about").unwrap();

        let router = Router::new(builder(&pages)).await.unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        router.on_reload(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        std::fs::remove_dir_all(&pages).unwrap();
        assert!(router.reload().await.is_err());

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(router.match_url("/about").is_some());
    }

    #[tokio::test]
    async fn test_router_records_match_metrics() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.html"), "home").unwrap();

        let metrics = Arc::new(Metrics::new());
        let router = Router::new(builder(dir.path())).await.unwrap().with_metrics(metrics.clone());

        router.match_url("/");
        router.match_url("/nope");

        assert_eq!(metrics.get_route_matches(), 1);
        assert_eq!(metrics.get_route_no_matches(), 1);
    }
}
