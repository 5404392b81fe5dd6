//! Engine-wide counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Running counters for one worker.
///
/// All counters are monotonic and safe to bump from concurrent fetch
/// handlers. Read them through [`EngineMetrics::snapshot`].
#[derive(Debug, Default)]
pub struct EngineMetrics {
    requests: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    network: AtomicU64,
    fallbacks: AtomicU64,
    bypasses: AtomicU64,
    network_failures: AtomicU64,
    cache_write_failures: AtomicU64,
    seeded: AtomicU64,
    generations_deleted: AtomicU64,
    network_time_us: AtomicU64,
}

impl EngineMetrics {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count an intercepted fetch event.
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a response served from the store.
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a store miss answered by the network.
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a network-first response.
    pub fn record_network(&self) {
        self.network.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a fallback to a cached copy after a network failure.
    pub fn record_fallback(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a request passed through untouched.
    pub fn record_bypass(&self) {
        self.bypasses.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a failed network attempt.
    pub fn record_network_failure(&self) {
        self.network_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a cache write that was dropped.
    pub fn record_cache_write_failure(&self) {
        self.cache_write_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Count entries stored during install.
    pub fn record_seeded(&self, count: u64) {
        self.seeded.fetch_add(count, Ordering::Relaxed);
    }

    /// Count generations removed during activation.
    pub fn record_generations_deleted(&self, count: u64) {
        self.generations_deleted.fetch_add(count, Ordering::Relaxed);
    }

    /// Accumulate time spent waiting on the network.
    pub fn record_network_time(&self, elapsed: Duration) {
        self.network_time_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    /// Read every counter at once.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            network: self.network.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
            bypasses: self.bypasses.load(Ordering::Relaxed),
            network_failures: self.network_failures.load(Ordering::Relaxed),
            cache_write_failures: self.cache_write_failures.load(Ordering::Relaxed),
            seeded: self.seeded.load(Ordering::Relaxed),
            generations_deleted: self.generations_deleted.load(Ordering::Relaxed),
            network_time_us: self.network_time_us.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`EngineMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub hits: u64,
    pub misses: u64,
    pub network: u64,
    pub fallbacks: u64,
    pub bypasses: u64,
    pub network_failures: u64,
    pub cache_write_failures: u64,
    pub seeded: u64,
    pub generations_deleted: u64,
    pub network_time_us: u64,
}

impl MetricsSnapshot {
    /// Share of intercepted requests answered from the store, in `0.0..=1.0`.
    pub fn hit_ratio(&self) -> f64 {
        let served = self.hits + self.misses + self.network + self.fallbacks;
        if served == 0 {
            return 0.0;
        }
        (self.hits + self.fallbacks) as f64 / served as f64
    }

    /// Format as JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Format as JSON (pretty printed).
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Format as human-readable summary.
    pub fn to_summary(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Requests: {}", self.requests));
        lines.push(format!(
            "  hit {} / miss {} / network {} / fallback {} / bypass {}",
            self.hits, self.misses, self.network, self.fallbacks, self.bypasses
        ));
        lines.push(format!("  Hit ratio: {:.1}%", self.hit_ratio() * 100.0));

        if self.network_failures > 0 {
            lines.push(format!("  Network failures: {}", self.network_failures));
        }
        if self.cache_write_failures > 0 {
            lines.push(format!("  Dropped cache writes: {}", self.cache_write_failures));
        }
        if self.seeded > 0 {
            lines.push(format!("  Seeded entries: {}", self.seeded));
        }
        if self.generations_deleted > 0 {
            lines.push(format!("  Generations deleted: {}", self.generations_deleted));
        }
        lines.push(format!(
            "  Network time: {}us ({:.2}ms)",
            self.network_time_us,
            self.network_time_us as f64 / 1000.0
        ));

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_snapshot_counts() {
        let metrics = EngineMetrics::new();
        metrics.record_request();
        metrics.record_request();
        metrics.record_hit();
        metrics.record_miss();
        metrics.record_seeded(12);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests, 2);
        assert_eq!(snapshot.hits, 1);
        assert_eq!(snapshot.misses, 1);
        assert_eq!(snapshot.seeded, 12);
        assert_eq!(snapshot.bypasses, 0);
    }

    #[test]
    fn test_hit_ratio() {
        assert_eq!(MetricsSnapshot::default().hit_ratio(), 0.0);

        let snapshot = MetricsSnapshot {
            hits: 2,
            fallbacks: 1,
            misses: 1,
            bypasses: 10,
            ..Default::default()
        };
        assert!((snapshot.hit_ratio() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_concurrent_increments() {
        let metrics = Arc::new(EngineMetrics::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let metrics = Arc::clone(&metrics);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        metrics.record_request();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(metrics.snapshot().requests, 800);
    }

    #[test]
    fn test_json_and_summary() {
        let metrics = EngineMetrics::new();
        metrics.record_fallback();
        metrics.record_network_failure();
        metrics.record_network_time(Duration::from_millis(3));

        let snapshot = metrics.snapshot();
        let parsed: MetricsSnapshot = serde_json::from_str(&snapshot.to_json()).unwrap();
        assert_eq!(parsed, snapshot);

        let summary = snapshot.to_summary();
        assert!(summary.contains("fallback 1"));
        assert!(summary.contains("Network failures: 1"));
        assert!(summary.contains("3000us"));
    }
}
