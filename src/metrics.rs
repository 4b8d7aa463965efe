//! Metrics counter interface for the fragment engine.
//!
//! The engine reports cache behavior through [`RenderMetrics`]. Production
//! deployments forward the counters to their metrics backend; tests use
//! [`TestMetrics`] to assert on hit and miss counts.

use std::collections::HashMap;
use std::sync::Mutex;

/// Fragment served from the store.
pub const CACHE_HIT: &str = "fragment_cache_hit_total";
/// Fragment not found in the store.
pub const CACHE_MISS: &str = "fragment_cache_miss_total";
/// Fragment renderer invoked.
pub const FRAGMENT_RENDERED: &str = "fragment_rendered_total";
/// Store operation failed (label `op`).
pub const STORE_ERROR: &str = "fragment_store_error_total";
/// Stored entry could not be decoded.
pub const CORRUPT_ENTRY: &str = "fragment_corrupt_entry_total";
/// Identity invalidated.
pub const INVALIDATION: &str = "fragment_invalidation_total";
/// Reference omitted (label `reason`: `cycle`, `depth`, `hidden`).
pub const REFERENCE_OMITTED: &str = "fragment_reference_omitted_total";

/// Metrics counter interface.
pub trait RenderMetrics: Send + Sync {
    /// Increment a counter by 1.
    fn increment(&self, metric_name: &str, labels: &[(&str, &str)]);
}

/// No-op metrics implementation.
#[derive(Debug, Default)]
pub struct NoOpMetrics;

impl RenderMetrics for NoOpMetrics {
    fn increment(&self, _metric_name: &str, _labels: &[(&str, &str)]) {
        // No-op
    }
}

/// In-memory metrics for testing.
#[derive(Debug, Default)]
pub struct TestMetrics {
    /// Counter values keyed by metric name and labels.
    pub counters: Mutex<HashMap<String, u64>>,
}

impl RenderMetrics for TestMetrics {
    fn increment(&self, metric_name: &str, labels: &[(&str, &str)]) {
        let key = format!("{}:{:?}", metric_name, labels);
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        *counters.entry(key).or_insert(0) += 1;
    }
}

impl TestMetrics {
    /// Get the count for a metric across all label sets.
    pub fn get_count(&self, metric_name: &str) -> u64 {
        let prefix = format!("{metric_name}:");
        let counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters
            .iter()
            .filter(|(k, _)| k.starts_with(&prefix))
            .map(|(_, v)| v)
            .sum()
    }

    /// Get the count for a metric with one specific label value.
    pub fn get_labeled(&self, metric_name: &str, label: &str, value: &str) -> u64 {
        let prefix = format!("{metric_name}:");
        let needle = format!("({label:?}, {value:?})");
        let counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters
            .iter()
            .filter(|(k, _)| k.starts_with(&prefix) && k.contains(&needle))
            .map(|(_, v)| v)
            .sum()
    }

    /// Reset all counters.
    pub fn reset(&self) {
        self.counters.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}
