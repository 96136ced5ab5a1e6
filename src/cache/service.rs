//! Page cache service
//!
//! `PageCacheService::get_or_create` is the single entry point for cached
//! page content. It answers from the store when it can and serves stale
//! content while regenerating it in the background (stale-while-revalidate).
//! At most one regeneration per key runs at a time.
//!
//! Store failures never fail a request: a failed read is treated as a miss
//! and a failed write is logged.
//!
//! Invalidation and `clear` bump a cache generation. A render that started
//! under an older generation does not write its result back, so pages
//! rendered before an invalidation cannot reappear after it.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::{RwLock, RwLockWriteGuard};

use super::entry::{CacheEntry, CacheResult, CacheStatus, CacheStrategy, Rendered};
use super::error::CacheError;
use super::stats::StoreStats;
use super::traits::CacheStore;
use crate::metrics::Metrics;
use crate::regeneration::{RegenerationGuard, RegenerationTracker};

/// Stale-while-revalidate page cache over a pluggable store
#[derive(Clone)]
pub struct PageCacheService {
    store: Arc<dyn CacheStore>,
    enabled: bool,
    regenerations: RegenerationTracker,
    generation: Arc<Generation>,
    metrics: Option<Arc<Metrics>>,
}

impl PageCacheService {
    pub fn new(store: Arc<dyn CacheStore>, enabled: bool) -> Self {
        Self {
            store,
            enabled,
            regenerations: RegenerationTracker::new(),
            generation: Arc::new(Generation::default()),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Get the page for `key`, rendering it with `render` when needed.
    ///
    /// - caching disabled: always renders, status `Miss`, store untouched
    /// - no entry: renders, stores the result unless its strategy is
    ///   `Dynamic`, status `Miss`
    /// - fresh entry: returns it, status `Hit`, `render` is not called
    /// - stale entry: returns it, status `Stale`, and regenerates in the
    ///   background unless a regeneration for `key` is already running
    ///
    /// Foreground render errors are returned unchanged. Background render
    /// errors are logged and leave the stale entry in place.
    pub async fn get_or_create<F, Fut, E>(
        &self,
        key: &str,
        default_strategy: &CacheStrategy,
        render: F,
    ) -> Result<CacheResult, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Rendered, E>> + Send + 'static,
        E: std::fmt::Display + Send + 'static,
    {
        if !self.enabled {
            if let Some(metrics) = &self.metrics {
                metrics.increment_cache_bypass();
            }
            let rendered = render().await?;
            let strategy = rendered.strategy.unwrap_or_else(|| default_strategy.clone());
            return Ok(CacheResult {
                html: rendered.html,
                status: CacheStatus::Miss,
                strategy,
            });
        }

        let cached = match self.store.get(key).await {
            Ok(cached) => cached,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed, rendering fresh");
                if let Some(metrics) = &self.metrics {
                    metrics.increment_store_read_error();
                }
                None
            }
        };

        let result = match cached {
            None => self.render_and_store(key, default_strategy, render).await?,
            Some(entry) if !entry.is_stale() => CacheResult {
                html: entry.html,
                status: CacheStatus::Hit,
                strategy: entry.strategy,
            },
            Some(entry) => {
                self.regenerate_in_background(key, default_strategy.clone(), render);
                CacheResult {
                    html: entry.html,
                    status: CacheStatus::Stale,
                    strategy: entry.strategy,
                }
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_cache_status(result.status);
        }
        Ok(result)
    }

    async fn render_and_store<F, Fut, E>(
        &self,
        key: &str,
        default_strategy: &CacheStrategy,
        render: F,
    ) -> Result<CacheResult, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Rendered, E>>,
    {
        let started_at = self.generation.current();
        let rendered = render().await?;
        let strategy = rendered.strategy.unwrap_or_else(|| default_strategy.clone());

        if strategy.is_cacheable() {
            let entry = CacheEntry::new(rendered.html.clone(), strategy.clone());
            let writer = EntryWriter {
                store: &*self.store,
                metrics: self.metrics.as_deref(),
                generation: &self.generation,
                started_at,
            };
            writer.write(key, entry).await;
        }

        Ok(CacheResult {
            html: rendered.html,
            status: CacheStatus::Miss,
            strategy,
        })
    }

    fn regenerate_in_background<F, Fut, E>(&self, key: &str, default_strategy: CacheStrategy, render: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Rendered, E>> + Send + 'static,
        E: std::fmt::Display + Send + 'static,
    {
        let Some(guard) = self.regenerations.try_begin(key) else {
            tracing::debug!(key = %key, "Regeneration already in flight");
            if let Some(metrics) = &self.metrics {
                metrics.increment_regeneration_deduplicated();
            }
            return;
        };

        if let Some(metrics) = &self.metrics {
            metrics.increment_regeneration_started();
        }
        tracing::debug!(key = %key, "Starting background regeneration");

        let store = self.store.clone();
        let metrics = self.metrics.clone();
        let generation = self.generation.clone();
        let started_at = generation.current();
        tokio::spawn(async move {
            let writer = EntryWriter {
                store: &*store,
                metrics: metrics.as_deref(),
                generation: &generation,
                started_at,
            };
            regenerate(guard, writer, default_strategy, render).await;
        });
    }

    /// Remove every entry tagged with any of `tags`
    pub async fn invalidate_by_tags(&self, tags: &[String]) -> Result<usize, CacheError> {
        let advanced = self.generation.advance().await;
        let removed = self.store.invalidate_by_tags(tags).await?;
        drop(advanced);
        self.record_invalidated(removed);
        tracing::info!(tags = ?tags, removed = removed, "Invalidated pages by tag");
        Ok(removed)
    }

    /// Remove the entries stored under exactly these keys
    pub async fn invalidate_by_paths(&self, paths: &[String]) -> Result<usize, CacheError> {
        let advanced = self.generation.advance().await;
        let removed = self.store.invalidate_by_paths(paths).await?;
        drop(advanced);
        self.record_invalidated(removed);
        tracing::info!(paths = ?paths, removed = removed, "Invalidated pages by path");
        Ok(removed)
    }

    pub async fn clear(&self) -> Result<(), CacheError> {
        let advanced = self.generation.advance().await;
        self.store.clear().await?;
        drop(advanced);
        tracing::info!("Cleared page cache");
        Ok(())
    }

    pub async fn stats(&self) -> Result<StoreStats, CacheError> {
        self.store.stats().await
    }

    /// Wait for the background regeneration of `key`, if one is running
    pub async fn settle(&self, key: &str) {
        self.regenerations.wait(key).await;
    }

    /// Wait for every background regeneration currently running
    pub async fn settle_all(&self) {
        self.regenerations.wait_all().await;
    }

    /// Number of background regenerations currently running
    pub fn in_flight_count(&self) -> usize {
        self.regenerations.in_flight_count()
    }

    fn record_invalidated(&self, removed: usize) {
        if let Some(metrics) = &self.metrics {
            metrics.add_invalidated_entries(removed as u64);
        }
    }
}

/// Body of a background regeneration task. The guard is held until the
/// task ends, however it ends.
async fn regenerate<F, Fut, E>(
    guard: RegenerationGuard,
    writer: EntryWriter<'_>,
    default_strategy: CacheStrategy,
    render: F,
) where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Rendered, E>>,
    E: std::fmt::Display,
{
    let key = guard.key().to_string();
    let start = Instant::now();

    match render().await {
        Ok(rendered) => {
            let strategy = rendered.strategy.unwrap_or(default_strategy);
            if strategy.is_cacheable() {
                let entry = CacheEntry::new(rendered.html, strategy);
                writer.write(&key, entry).await;
            } else if let Err(e) = writer.store.delete(&key).await {
                // Page turned dynamic; the old entry must not be served again
                tracing::warn!(key = %key, error = %e, "Failed to drop entry of now-dynamic page");
            }

            if let Some(metrics) = writer.metrics {
                metrics.increment_regeneration_succeeded();
            }
            tracing::info!(
                key = %key,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Regenerated page"
            );
        }
        Err(e) => {
            if let Some(metrics) = writer.metrics {
                metrics.increment_regeneration_failed();
            }
            tracing::error!(key = %key, error = %e, "Background regeneration failed, keeping stale entry");
        }
    }

    drop(guard);
}

/// Cache generation, advanced by every invalidation and clear
#[derive(Default)]
struct Generation {
    current: AtomicU64,
    lock: RwLock<()>,
}

impl Generation {
    fn current(&self) -> u64 {
        self.current.load(Ordering::Acquire)
    }

    /// Advance the generation. Writes are blocked until the guard drops.
    async fn advance(&self) -> RwLockWriteGuard<'_, ()> {
        let guard = self.lock.write().await;
        self.current.fetch_add(1, Ordering::AcqRel);
        guard
    }
}

/// Writes rendered pages back to the store unless the cache was
/// invalidated after the render started
struct EntryWriter<'a> {
    store: &'a dyn CacheStore,
    metrics: Option<&'a Metrics>,
    generation: &'a Generation,
    started_at: u64,
}

impl EntryWriter<'_> {
    async fn write(&self, key: &str, entry: CacheEntry) {
        // Held across the set so an invalidation cannot interleave
        let _guard = self.generation.lock.read().await;
        if self.generation.current() != self.started_at {
            tracing::debug!(key = %key, "Cache invalidated during render, discarding result");
            if let Some(metrics) = self.metrics {
                metrics.increment_write_discarded();
            }
            return;
        }

        if let Err(e) = self.store.set(key, entry).await {
            tracing::warn!(key = %key, error = %e, "Cache write failed");
            if let Some(metrics) = self.metrics {
                metrics.increment_store_write_error();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, SystemTime};

    fn service() -> PageCacheService {
        PageCacheService::new(Arc::new(MemoryStore::new(100)), true)
    }

    fn counting_render(
        calls: &Arc<AtomicUsize>,
        html: &'static str,
        strategy: Option<CacheStrategy>,
    ) -> impl FnOnce() -> std::future::Ready<Result<Rendered, String>> + Send + 'static {
        let calls = calls.clone();
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(Rendered {
                html: html.to_string(),
                strategy,
            }))
        }
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let service = service();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = service
            .get_or_create("/a", &CacheStrategy::Static, counting_render(&calls, "<a>", None))
            .await
            .unwrap();
        let second = service
            .get_or_create("/a", &CacheStrategy::Static, counting_render(&calls, "<b>", None))
            .await
            .unwrap();

        assert_eq!(first.status, CacheStatus::Miss);
        assert_eq!(second.status, CacheStatus::Hit);
        assert_eq!(second.html, "<a>");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rendered_strategy_overrides_default() {
        let service = service();
        let calls = Arc::new(AtomicUsize::new(0));

        let result = service
            .get_or_create(
                "/a",
                &CacheStrategy::Static,
                counting_render(&calls, "<a>", Some(CacheStrategy::Dynamic)),
            )
            .await
            .unwrap();

        assert_eq!(result.strategy, CacheStrategy::Dynamic);
        assert!(service.store().get("/a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_foreground_render_error_propagates() {
        let service = service();
        let result = service
            .get_or_create("/a", &CacheStrategy::Static, || async {
                Err::<Rendered, _>("boom".to_string())
            })
            .await;

        assert_eq!(result.unwrap_err(), "boom");
        assert!(service.store().get("/a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stale_entry_served_then_replaced() {
        let service = service();
        let old = SystemTime::now() - Duration::from_secs(120);
        service
            .store()
            .set("/a", CacheEntry::with_created_at("old", CacheStrategy::timed(60, &[]), old))
            .await
            .unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let stale = service
            .get_or_create("/a", &CacheStrategy::Static, counting_render(&calls, "new", None))
            .await
            .unwrap();
        assert_eq!(stale.status, CacheStatus::Stale);
        assert_eq!(stale.html, "old");

        service.settle("/a").await;
        assert_eq!(service.in_flight_count(), 0);

        let fresh = service
            .get_or_create("/a", &CacheStrategy::Static, counting_render(&calls, "newer", None))
            .await
            .unwrap();
        assert_eq!(fresh.status, CacheStatus::Hit);
        assert_eq!(fresh.html, "new");
        // Default strategy applies to the regenerated entry
        assert_eq!(fresh.strategy, CacheStrategy::Static);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_regeneration_turning_dynamic_drops_entry() {
        let service = service();
        let old = SystemTime::now() - Duration::from_secs(120);
        service
            .store()
            .set("/a", CacheEntry::with_created_at("old", CacheStrategy::timed(60, &[]), old))
            .await
            .unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        service
            .get_or_create(
                "/a",
                &CacheStrategy::Static,
                counting_render(&calls, "live", Some(CacheStrategy::Dynamic)),
            )
            .await
            .unwrap();
        service.settle("/a").await;

        assert!(service.store().get("/a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_disabled_service_never_touches_store() {
        let service = PageCacheService::new(Arc::new(MemoryStore::new(10)), false);
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let result = service
                .get_or_create("/a", &CacheStrategy::Static, counting_render(&calls, "<a>", None))
                .await
                .unwrap();
            assert_eq!(result.status, CacheStatus::Miss);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(service.stats().await.unwrap().entries, 0);
    }

    #[tokio::test]
    async fn test_metrics_record_lookup_outcomes() {
        let metrics = Arc::new(Metrics::new());
        let service = service().with_metrics(metrics.clone());
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            service
                .get_or_create("/a", &CacheStrategy::Static, counting_render(&calls, "<a>", None))
                .await
                .unwrap();
        }

        assert_eq!(metrics.get_cache_misses(), 1);
        assert_eq!(metrics.get_cache_hits(), 2);
    }
}
