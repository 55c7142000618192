use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::time::{self, Duration};
use tracing::info;

#[derive(Debug, Default)]
pub struct StatsCollector {
    requests: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    cache_errors: AtomicU64,
    not_found: AtomicU64,
    rejected: AtomicU64,
    failures: AtomicU64,
    conversions: AtomicU64,
    // Storage round trips, for average query latency
    storage_total_ms: AtomicU64,
    storage_count: AtomicU64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_errors: u64,
    pub not_found: u64,
    pub rejected: u64,
    pub failures: u64,
    pub conversions: u64,
    pub storage_queries: u64,
    pub storage_avg_ms: u64,
}

impl StatsCollector {
    /// Creates a collector. A zero interval disables the periodic dump.
    pub fn new(log_interval_sec: u64) -> Arc<Self> {
        let stats = Arc::new(Self::default());

        if log_interval_sec > 0 {
            let stats_clone = stats.clone();
            let interval = Duration::from_secs(log_interval_sec);
            tokio::spawn(async move {
                stats_clone.run_logger(interval).await;
            });
        }

        stats
    }

    pub fn inc_requests(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_cache_error(&self) {
        self.cache_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_not_found(&self) {
        self.not_found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failures(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_conversions(&self) {
        self.conversions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_storage_latency(&self, ms: u64) {
        self.storage_total_ms.fetch_add(ms, Ordering::Relaxed);
        self.storage_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_snapshot(&self) -> StatsSnapshot {
        let storage_queries = self.storage_count.load(Ordering::Relaxed);
        let storage_total_ms = self.storage_total_ms.load(Ordering::Relaxed);

        StatsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            cache_errors: self.cache_errors.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            conversions: self.conversions.load(Ordering::Relaxed),
            storage_queries,
            storage_avg_ms: storage_total_ms.checked_div(storage_queries).unwrap_or(0),
        }
    }

    async fn run_logger(&self, period: Duration) {
        let mut interval = time::interval(period);
        loop {
            interval.tick().await;
            self.dump_stats();
        }
    }

    fn dump_stats(&self) {
        let s = self.get_snapshot();
        let pct = |n: u64| {
            if s.requests > 0 {
                (n as f64 / s.requests as f64) * 100.0
            } else {
                0.0
            }
        };

        info!(
            "STATS DUMP: Requests: {}, CacheHits: {} ({:.1}%), NotFound: {}, Rejected: {}, Failures: {} ({:.1}%), Conversions: {}, Storage: {} queries [{}ms avg]",
            s.requests,
            s.cache_hits,
            pct(s.cache_hits),
            s.not_found,
            s.rejected,
            s.failures,
            pct(s.failures),
            s.conversions,
            s.storage_queries,
            s.storage_avg_ms
        );
    }
}
