//! Lookup metrics for resource containers.
//!
//! A factory owns one `ResourceMetrics` and shares it with every container it
//! creates, so a report covers all lookups served through that factory.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct ResourceMetrics {
    /// Number of `find` calls served
    lookups: AtomicUsize,

    /// Number of lookups answered by an already loaded bundle
    bundle_hits: AtomicUsize,

    /// Number of bundles loaded from their backing store
    bundle_loads: AtomicUsize,

    /// Number of lookups that resolved to an empty value
    key_misses: AtomicUsize,
}

impl ResourceMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_lookup(&self) {
        self.lookups.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bundle_hit(&self) {
        self.bundle_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bundle_load(&self) {
        self.bundle_loads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_key_miss(&self) {
        self.key_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }

    pub fn bundle_hits(&self) -> usize {
        self.bundle_hits.load(Ordering::Relaxed)
    }

    pub fn bundle_loads(&self) -> usize {
        self.bundle_loads.load(Ordering::Relaxed)
    }

    pub fn key_misses(&self) -> usize {
        self.key_misses.load(Ordering::Relaxed)
    }

    /// Generate a metrics report.
    pub fn report(&self) -> MetricsReport {
        let hits = self.bundle_hits();
        let loads = self.bundle_loads();
        let bundle_queries = hits + loads;
        let bundle_hit_rate = if bundle_queries > 0 {
            (hits as f64 / bundle_queries as f64) * 100.0
        } else {
            0.0
        };

        MetricsReport {
            lookups: self.lookups(),
            bundle_hits: hits,
            bundle_loads: loads,
            bundle_hit_rate,
            key_misses: self.key_misses(),
        }
    }
}

/// Point-in-time copy of a `ResourceMetrics`.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub lookups: usize,
    pub bundle_hits: usize,
    pub bundle_loads: usize,

    /// Share of bundle accesses served from cache, as a percentage (0-100)
    pub bundle_hit_rate: f64,

    pub key_misses: usize,
}
