//! TTL response cache for assembled metric payloads.

use super::key::CacheKey;
use crate::config::CacheConfig;
use crate::error::CacheError;
use crate::models::Metric;
use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::debug;

/// Immutable, shareable view of a cached response.
pub type CachedMetrics = Arc<[Metric]>;

/// Key-value store with per-entry expiry, shared by all in-flight requests.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Never returns an entry older than the TTL.
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedMetrics>, CacheError>;

    /// Replaces any existing entry and restarts its TTL.
    async fn set(&self, key: CacheKey, value: CachedMetrics) -> Result<(), CacheError>;

    fn entry_count(&self) -> u64 {
        0
    }
}

#[derive(Clone)]
struct CacheEntry {
    metrics: CachedMetrics,
    inserted_at: Instant,
}

/// Moka-backed cache: size-bounded, with TTL eviction plus an age check on read.
#[derive(Clone)]
pub struct CacheStore {
    cache: Cache<CacheKey, CacheEntry>,
    ttl: Duration,
}

impl CacheStore {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();
        Self { cache, ttl }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.capacity, Duration::from_secs(config.ttl_seconds))
    }

    /// Flushes moka's pending maintenance, dropping expired entries.
    pub async fn sweep(&self) {
        self.cache.run_pending_tasks().await;
    }

    /// Runs `sweep` every `period` until the handle is aborted.
    pub fn spawn_sweeper(&self, period: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                store.sweep().await;
                debug!("Cache sweep done, {} entries live", store.cache.entry_count());
            }
        })
    }
}

#[async_trait]
impl ResponseCache for CacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedMetrics>, CacheError> {
        match self.cache.get(key).await {
            Some(entry) if entry.inserted_at.elapsed() >= self.ttl => {
                self.cache.invalidate(key).await;
                debug!("Cache EXPIRED: {}", key);
                Ok(None)
            }
            Some(entry) => {
                debug!("Cache HIT: {}", key);
                Ok(Some(entry.metrics))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: CacheKey, value: CachedMetrics) -> Result<(), CacheError> {
        debug!("Cache STORE: {} ({} records)", key, value.len());
        self.cache
            .insert(
                key,
                CacheEntry {
                    metrics: value,
                    inserted_at: Instant::now(),
                },
            )
            .await;
        Ok(())
    }

    fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

/// Used when caching is switched off in config; every lookup misses.
pub struct DisabledCache;

#[async_trait]
impl ResponseCache for DisabledCache {
    async fn get(&self, _key: &CacheKey) -> Result<Option<CachedMetrics>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: CacheKey, _value: CachedMetrics) -> Result<(), CacheError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn payload(value: f64) -> CachedMetrics {
        Arc::from(vec![Metric {
            id: 1,
            value,
            date: Utc::now(),
            unit_name: "Kilogram".to_string(),
            unit_type: "weight".to_string(),
            unit: "kg".to_string(),
            full_name: None,
            username: None,
        }])
    }

    fn key(unit_type: &str) -> CacheKey {
        CacheKey::derive(Some(unit_type), None, None)
    }

    #[tokio::test]
    async fn test_get_after_set() {
        let store = CacheStore::new(100, Duration::from_secs(60));
        assert!(store.get(&key("weight")).await.unwrap().is_none());

        store.set(key("weight"), payload(1.0)).await.unwrap();
        let hit = store.get(&key("weight")).await.unwrap().unwrap();
        assert_eq!(hit[0].value, 1.0);
        assert!(store.get(&key("distance")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let store = CacheStore::new(100, Duration::from_secs(60));
        store.set(key("weight"), payload(1.0)).await.unwrap();
        store.set(key("weight"), payload(2.0)).await.unwrap();

        let hit = store.get(&key("weight")).await.unwrap().unwrap();
        assert_eq!(hit[0].value, 2.0);
    }

    #[tokio::test]
    async fn test_expired_entry_not_returned() {
        let store = CacheStore::new(100, Duration::from_millis(50));
        store.set(key("weight"), payload(1.0)).await.unwrap();
        assert!(store.get(&key("weight")).await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(store.get(&key("weight")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sweep_drops_expired_entries() {
        let store = CacheStore::new(100, Duration::from_millis(30));
        store.set(key("weight"), payload(1.0)).await.unwrap();
        store.set(key("distance"), payload(2.0)).await.unwrap();
        store.sweep().await;
        assert_eq!(store.entry_count(), 2);

        tokio::time::sleep(Duration::from_millis(60)).await;
        store.sweep().await;
        assert_eq!(store.entry_count(), 0);
    }

    #[tokio::test]
    async fn test_sweeper_drops_expired_entries() {
        let store = CacheStore::new(100, Duration::from_millis(30));
        store.set(key("weight"), payload(1.0)).await.unwrap();
        store.set(key("distance"), payload(2.0)).await.unwrap();

        let handle = store.spawn_sweeper(Duration::from_millis(20));
        let mut remaining = u64::MAX;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            remaining = store.entry_count();
            if remaining == 0 {
                break;
            }
        }
        handle.abort();
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn test_disabled_cache_always_misses() {
        let cache = DisabledCache;
        cache.set(key("weight"), payload(1.0)).await.unwrap();
        assert!(cache.get(&key("weight")).await.unwrap().is_none());
    }
}
