//! Dictionary store metrics.
//!
//! Counters for cache hits, misses, network fetches and failed loads. Each
//! `TranslationStore` owns its own instance so tests never share counters.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters for a single translation store.
#[derive(Debug, Default)]
pub struct StoreMetrics {
    /// Number of loads answered from the in-memory cache
    cache_hits: AtomicUsize,

    /// Number of loads that had to go to the network
    cache_misses: AtomicUsize,

    /// Number of HTTP requests issued (retries included)
    fetches: AtomicUsize,

    /// Number of loads that degraded to an empty dictionary
    load_failures: AtomicUsize,
}

impl StoreMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetch(&self) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load_failure(&self) {
        self.load_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cache_hits(&self) -> usize {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> usize {
        self.cache_misses.load(Ordering::Relaxed)
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }

    pub fn load_failures(&self) -> usize {
        self.load_failures.load(Ordering::Relaxed)
    }

    /// Generate a metrics report.
    pub fn report(&self) -> MetricsReport {
        let hits = self.cache_hits();
        let misses = self.cache_misses();
        let total_loads = hits + misses;
        let cache_hit_rate = if total_loads > 0 {
            (hits as f64 / total_loads as f64) * 100.0
        } else {
            0.0
        };

        MetricsReport {
            cache_hits: hits,
            cache_misses: misses,
            cache_hit_rate,
            fetches: self.fetches(),
            load_failures: self.load_failures(),
        }
    }
}

/// Snapshot of store statistics.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub cache_hits: usize,

    pub cache_misses: usize,

    /// Cache hit rate as a percentage (0-100)
    pub cache_hit_rate: f64,

    pub fetches: usize,

    pub load_failures: usize,
}
