//! Interception counters.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use edge_core::ResponseSource;
use serde::{Deserialize, Serialize};

/// Process-wide counters for intercepted requests.
///
/// Counters are monotonic and only ever incremented, so handlers never
/// observe each other through them.
#[derive(Debug, Default)]
pub struct InterceptMetrics {
    served: [AtomicU64; ResponseSource::ALL.len()],
    cache_writes: AtomicU64,
    cache_write_failures: AtomicU64,
}

impl InterceptMetrics {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one response by source.
    pub fn record(&self, source: ResponseSource) {
        self.served[index(source)].fetch_add(1, Ordering::Relaxed);
    }

    /// Count one cache write attempt.
    pub fn record_cache_write(&self, ok: bool) {
        if ok {
            self.cache_writes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cache_write_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Responses served from `source` so far.
    pub fn served(&self, source: ResponseSource) -> u64 {
        self.served[index(source)].load(Ordering::Relaxed)
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let served = ResponseSource::ALL
            .iter()
            .map(|s| (s.to_string(), self.served(*s)))
            .collect();

        MetricsSnapshot {
            served,
            cache_writes: self.cache_writes.load(Ordering::Relaxed),
            cache_write_failures: self.cache_write_failures.load(Ordering::Relaxed),
        }
    }
}

fn index(source: ResponseSource) -> usize {
    match source {
        ResponseSource::Network => 0,
        ResponseSource::Cache => 1,
        ResponseSource::Fallback => 2,
        ResponseSource::Synthetic => 3,
        ResponseSource::Unavailable => 4,
        ResponseSource::Passthrough => 5,
    }
}

/// Serializable copy of [`InterceptMetrics`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Responses per source.
    pub served: BTreeMap<String, u64>,
    /// Successful cache writes.
    pub cache_writes: u64,
    /// Failed cache writes (dropped).
    pub cache_write_failures: u64,
}

impl MetricsSnapshot {
    /// Total intercepted or passed-through responses.
    pub fn total(&self) -> u64 {
        self.served.values().sum()
    }

    /// Fraction of intercepted responses answered by the cache.
    pub fn cache_ratio(&self) -> f64 {
        let from_cache = self.served.get("cache").copied().unwrap_or(0)
            + self.served.get("fallback").copied().unwrap_or(0);
        let intercepted = self.total() - self.served.get("passthrough").copied().unwrap_or(0);
        if intercepted == 0 {
            return 0.0;
        }
        from_cache as f64 / intercepted as f64
    }

    /// Format as JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
