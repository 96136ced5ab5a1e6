// Metrics module - Prometheus-compatible metrics tracking
// Provides counters and latency histograms for the router and the page cache

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::cache::CacheStatus;

/// Histogram represents percentile statistics for latency measurements
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Histogram {
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

impl Histogram {
    fn empty() -> Self {
        Histogram {
            p50: 0.0,
            p90: 0.0,
            p95: 0.0,
            p99: 0.0,
        }
    }
}

/// Metrics struct tracks counters and histograms for Prometheus export
/// Thread-safe via atomic operations and mutexes
pub struct Metrics {
    // Page cache lookups by outcome
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    cache_stale: AtomicU64,
    // Lookups answered with caching disabled
    cache_bypass: AtomicU64,

    // Store failures (reads count as misses, writes are dropped)
    store_read_errors: AtomicU64,
    store_write_errors: AtomicU64,
    // Renders finished after an invalidation, not written back
    writes_discarded: AtomicU64,

    // Background regeneration
    regenerations_started: AtomicU64,
    regenerations_succeeded: AtomicU64,
    regenerations_failed: AtomicU64,
    regenerations_deduplicated: AtomicU64,

    // Entries removed by tag/path invalidation
    invalidated_entries: AtomicU64,

    // Routing
    route_matches: AtomicU64,
    route_no_matches: AtomicU64,
    router_reloads: AtomicU64,

    // Renders by integration name
    render_counts: Mutex<HashMap<String, u64>>,

    // Render duration tracking (stored in microseconds as u64)
    render_durations: Mutex<Vec<u64>>,
}

impl Metrics {
    /// Create a new Metrics instance
    pub fn new() -> Self {
        Metrics {
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            cache_stale: AtomicU64::new(0),
            cache_bypass: AtomicU64::new(0),
            store_read_errors: AtomicU64::new(0),
            store_write_errors: AtomicU64::new(0),
            writes_discarded: AtomicU64::new(0),
            regenerations_started: AtomicU64::new(0),
            regenerations_succeeded: AtomicU64::new(0),
            regenerations_failed: AtomicU64::new(0),
            regenerations_deduplicated: AtomicU64::new(0),
            invalidated_entries: AtomicU64::new(0),
            route_matches: AtomicU64::new(0),
            route_no_matches: AtomicU64::new(0),
            router_reloads: AtomicU64::new(0),
            render_counts: Mutex::new(HashMap::new()),
            render_durations: Mutex::new(Vec::new()),
        }
    }

    /// Record the outcome of a page cache lookup
    pub fn record_cache_status(&self, status: CacheStatus) {
        let counter = match status {
            CacheStatus::Hit => &self.cache_hits,
            CacheStatus::Miss => &self.cache_misses,
            CacheStatus::Stale => &self.cache_stale,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_cache_bypass(&self) {
        self.cache_bypass.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_store_read_error(&self) {
        self.store_read_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_store_write_error(&self) {
        self.store_write_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_write_discarded(&self) {
        self.writes_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_regeneration_started(&self) {
        self.regenerations_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_regeneration_succeeded(&self) {
        self.regenerations_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_regeneration_failed(&self) {
        self.regenerations_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// A stale read found a regeneration already in flight
    pub fn increment_regeneration_deduplicated(&self) {
        self.regenerations_deduplicated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_invalidated_entries(&self, count: u64) {
        self.invalidated_entries.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_route_match(&self) {
        self.route_matches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_route_no_match(&self) {
        self.route_no_matches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_router_reload(&self) {
        self.router_reloads.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one render through the named integration
    pub fn increment_render_count(&self, integration: &str) {
        if let Ok(mut counts) = self.render_counts.lock() {
            *counts.entry(integration.to_string()).or_insert(0) += 1;
        }
    }

    /// Record a render duration in milliseconds
    pub fn record_render_duration(&self, duration_ms: f64) {
        let duration_us = (duration_ms * 1000.0) as u64;
        if let Ok(mut durations) = self.render_durations.lock() {
            durations.push(duration_us);
        }
    }

    pub fn get_cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn get_cache_misses(&self) -> u64 {
        self.cache_misses.load(Ordering::Relaxed)
    }

    pub fn get_cache_stale(&self) -> u64 {
        self.cache_stale.load(Ordering::Relaxed)
    }

    pub fn get_cache_bypass(&self) -> u64 {
        self.cache_bypass.load(Ordering::Relaxed)
    }

    pub fn get_store_read_errors(&self) -> u64 {
        self.store_read_errors.load(Ordering::Relaxed)
    }

    pub fn get_store_write_errors(&self) -> u64 {
        self.store_write_errors.load(Ordering::Relaxed)
    }

    pub fn get_writes_discarded(&self) -> u64 {
        self.writes_discarded.load(Ordering::Relaxed)
    }

    pub fn get_regenerations_started(&self) -> u64 {
        self.regenerations_started.load(Ordering::Relaxed)
    }

    pub fn get_regenerations_succeeded(&self) -> u64 {
        self.regenerations_succeeded.load(Ordering::Relaxed)
    }

    pub fn get_regenerations_failed(&self) -> u64 {
        self.regenerations_failed.load(Ordering::Relaxed)
    }

    pub fn get_regenerations_deduplicated(&self) -> u64 {
        self.regenerations_deduplicated.load(Ordering::Relaxed)
    }

    pub fn get_invalidated_entries(&self) -> u64 {
        self.invalidated_entries.load(Ordering::Relaxed)
    }

    pub fn get_route_matches(&self) -> u64 {
        self.route_matches.load(Ordering::Relaxed)
    }

    pub fn get_route_no_matches(&self) -> u64 {
        self.route_no_matches.load(Ordering::Relaxed)
    }

    pub fn get_router_reloads(&self) -> u64 {
        self.router_reloads.load(Ordering::Relaxed)
    }

    pub fn get_render_count(&self, integration: &str) -> u64 {
        self.render_counts
            .lock()
            .ok()
            .and_then(|counts| counts.get(integration).copied())
            .unwrap_or(0)
    }

    /// Calculate histogram from render duration samples
    pub fn get_render_duration_histogram(&self) -> Histogram {
        if let Ok(durations) = self.render_durations.lock() {
            calculate_histogram(&durations)
        } else {
            Histogram::empty()
        }
    }

    /// Render all metrics in the Prometheus text exposition format
    pub fn export_prometheus(&self) -> String {
        let mut output = String::new();

        // Page cache metrics
        output.push_str("# HELP page_cache_lookups_total Page cache lookups by status\n");
        output.push_str("# TYPE page_cache_lookups_total counter\n");
        for (status, counter) in [
            ("hit", &self.cache_hits),
            ("miss", &self.cache_misses),
            ("stale", &self.cache_stale),
            ("disabled", &self.cache_bypass),
        ] {
            output.push_str(&format!(
                "page_cache_lookups_total{{status=\"{}\"}} {}\n",
                status,
                counter.load(Ordering::Relaxed)
            ));
        }

        output.push_str("\n# HELP page_cache_store_errors_total Cache store failures by operation\n");
        output.push_str("# TYPE page_cache_store_errors_total counter\n");
        output.push_str(&format!(
            "page_cache_store_errors_total{{operation=\"read\"}} {}\n",
            self.store_read_errors.load(Ordering::Relaxed)
        ));
        output.push_str(&format!(
            "page_cache_store_errors_total{{operation=\"write\"}} {}\n",
            self.store_write_errors.load(Ordering::Relaxed)
        ));

        output.push_str("\n# HELP page_cache_writes_discarded_total Renders not stored because the cache was invalidated meanwhile\n");
        output.push_str("# TYPE page_cache_writes_discarded_total counter\n");
        output.push_str(&format!(
            "page_cache_writes_discarded_total {}\n",
            self.writes_discarded.load(Ordering::Relaxed)
        ));

        output.push_str("\n# HELP page_cache_invalidated_entries_total Entries removed by tag or path invalidation\n");
        output.push_str("# TYPE page_cache_invalidated_entries_total counter\n");
        output.push_str(&format!(
            "page_cache_invalidated_entries_total {}\n",
            self.invalidated_entries.load(Ordering::Relaxed)
        ));

        // Regeneration metrics
        output.push_str("\n# HELP page_regenerations_total Background regenerations by outcome\n");
        output.push_str("# TYPE page_regenerations_total counter\n");
        for (outcome, counter) in [
            ("started", &self.regenerations_started),
            ("succeeded", &self.regenerations_succeeded),
            ("failed", &self.regenerations_failed),
            ("deduplicated", &self.regenerations_deduplicated),
        ] {
            output.push_str(&format!(
                "page_regenerations_total{{outcome=\"{}\"}} {}\n",
                outcome,
                counter.load(Ordering::Relaxed)
            ));
        }

        // Routing metrics
        output.push_str("\n# HELP route_matches_total URL match attempts by result\n");
        output.push_str("# TYPE route_matches_total counter\n");
        output.push_str(&format!(
            "route_matches_total{{result=\"matched\"}} {}\n",
            self.route_matches.load(Ordering::Relaxed)
        ));
        output.push_str(&format!(
            "route_matches_total{{result=\"none\"}} {}\n",
            self.route_no_matches.load(Ordering::Relaxed)
        ));

        output.push_str("\n# HELP router_reloads_total Route table reloads\n");
        output.push_str("# TYPE router_reloads_total counter\n");
        output.push_str(&format!(
            "router_reloads_total {}\n",
            self.router_reloads.load(Ordering::Relaxed)
        ));

        // Render metrics
        output.push_str("\n# HELP page_renders_total Page renders by integration\n");
        output.push_str("# TYPE page_renders_total counter\n");
        if let Ok(counts) = self.render_counts.lock() {
            let mut sorted: Vec<_> = counts.iter().collect();
            sorted.sort();
            for (integration, count) in sorted {
                output.push_str(&format!(
                    "page_renders_total{{integration=\"{}\"}} {}\n",
                    integration, count
                ));
            }
        }

        let histogram = self.get_render_duration_histogram();
        output.push_str("\n# HELP page_render_duration_ms Page render duration in milliseconds\n");
        output.push_str("# TYPE page_render_duration_ms summary\n");
        for (quantile, value) in [
            ("0.5", histogram.p50),
            ("0.9", histogram.p90),
            ("0.95", histogram.p95),
            ("0.99", histogram.p99),
        ] {
            output.push_str(&format!(
                "page_render_duration_ms{{quantile=\"{}\"}} {}\n",
                quantile, value
            ));
        }

        output
    }
}

/// Calculate percentiles from a vector of samples (in microseconds)
fn calculate_histogram(samples: &[u64]) -> Histogram {
    if samples.is_empty() {
        return Histogram::empty();
    }

    let mut sorted: Vec<u64> = samples.to_vec();
    sorted.sort_unstable();

    let percentile = |p: f64| {
        let idx = (sorted.len() as f64 * p) as usize;
        // Convert from microseconds to milliseconds
        sorted.get(idx.saturating_sub(1)).copied().unwrap_or(0) as f64 / 1000.0
    };

    Histogram {
        p50: percentile(0.50),
        p90: percentile(0.90),
        p95: percentile(0.95),
        p99: percentile(0.99),
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
