use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use octocache_core::glob_match;
use octocache_storage::{CacheError, CacheResult, PrimaryCache};
use parking_lot::Mutex;

/// A cached entry with TTL support.
#[derive(Clone, Debug)]
pub struct CachedEntry {
    pub value: Arc<str>,
    pub cached_at: Instant,
    pub ttl: Duration,
}

impl CachedEntry {
    /// Create a new cached entry.
    pub fn new(value: &str, ttl: Duration) -> Self {
        Self {
            value: Arc::from(value),
            cached_at: Instant::now(),
            ttl,
        }
    }

    /// Check if this entry has expired.
    pub fn is_expired(&self) -> bool {
        self.cached_at.elapsed() >= self.ttl
    }
}

/// In-process [`PrimaryCache`] backed by a `DashMap`.
///
/// Expired entries are dropped lazily on access and skipped by scans and
/// counts. Every `del_batch` call is recorded so callers can inspect how a
/// bulk delete was chunked.
#[derive(Debug)]
pub struct MemoryPrimaryCache {
    entries: DashMap<String, CachedEntry>,
    available: AtomicBool,
    closed: AtomicBool,
    latency_ms: AtomicU64,
    /// Remaining successful `del_batch` calls before failures start.
    delete_budget: AtomicUsize,
    delete_batches: Mutex<Vec<usize>>,
}

impl Default for MemoryPrimaryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPrimaryCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            available: AtomicBool::new(true),
            closed: AtomicBool::new(false),
            latency_ms: AtomicU64::new(0),
            delete_budget: AtomicUsize::new(usize::MAX),
            delete_batches: Mutex::new(Vec::new()),
        }
    }

    /// Simulate an outage (`false`) or recovery (`true`).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Delay every round trip by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        let ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.latency_ms.store(ms, Ordering::SeqCst);
    }

    /// Let the next `batches` delete calls succeed and fail the ones after.
    pub fn fail_deletes_after(&self, batches: usize) {
        self.delete_budget.store(batches, Ordering::SeqCst);
    }

    /// Sizes of every `del_batch` call seen so far, in call order.
    pub fn delete_batches(&self) -> Vec<usize> {
        self.delete_batches.lock().clone()
    }

    /// Returns `true` once `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Number of stored entries including expired ones not yet evicted.
    pub fn raw_len(&self) -> usize {
        self.entries.len()
    }

    async fn round_trip(&self, op: &str) -> CacheResult<()> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.closed.load(Ordering::SeqCst) {
            return Err(CacheError::primary_cache(format!("{op}: connection closed")));
        }
        if !self.available.load(Ordering::SeqCst) {
            return Err(CacheError::primary_cache(format!("{op}: backend unavailable")));
        }
        Ok(())
    }

    fn live_value(&self, key: &str) -> Option<String> {
        let entry = self.entries.get(key)?;
        if entry.is_expired() {
            drop(entry);
            self.entries.remove_if(key, |_, e| e.is_expired());
            return None;
        }
        Some(entry.value.to_string())
    }
}

#[async_trait]
impl PrimaryCache for MemoryPrimaryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.round_trip("GET").await?;
        Ok(self.live_value(key))
    }

    async fn get_many(&self, keys: &[String]) -> CacheResult<Vec<Option<String>>> {
        self.round_trip("MGET").await?;
        Ok(keys.iter().map(|k| self.live_value(k)).collect())
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        self.round_trip("SET").await?;
        self.entries
            .insert(key.to_string(), CachedEntry::new(value, ttl));
        Ok(())
    }

    async fn scan_native(&self, pattern: &str, limit: u64) -> CacheResult<Vec<String>> {
        self.round_trip("SCAN").await?;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        let keys = self
            .entries
            .iter()
            .filter(|e| !e.value().is_expired() && glob_match(pattern, e.key()))
            .map(|e| e.key().clone())
            .take(limit)
            .collect();
        Ok(keys)
    }

    async fn del_batch(&self, keys: &[String]) -> CacheResult<()> {
        self.round_trip("DEL").await?;
        let allowed = self
            .delete_budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| {
                (left > 0).then(|| left.saturating_sub(1))
            })
            .is_ok();
        if !allowed {
            return Err(CacheError::primary_cache("DEL: injected failure"));
        }

        self.delete_batches.lock().push(keys.len());
        for key in keys {
            self.entries.remove(key);
        }
        Ok(())
    }

    async fn count(&self) -> CacheResult<u64> {
        self.round_trip("DBSIZE").await?;
        let live = self.entries.iter().filter(|e| !e.is_expired()).count();
        Ok(live as u64)
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::debug!("memory primary cache closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_set() {
        let cache = MemoryPrimaryCache::new();
        cache
            .set("k", "v", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(cache.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expiration() {
        let cache = MemoryPrimaryCache::new();
        cache
            .set("k", "v", Duration::from_millis(50))
            .await
            .unwrap();
        assert!(cache.get("k").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(cache.get("k").await.unwrap().is_none());
        assert_eq!(cache.count().await.unwrap(), 0);
        assert_eq!(cache.raw_len(), 0);
    }

    #[tokio::test]
    async fn test_scan_native_matches_glob() {
        let cache = MemoryPrimaryCache::new();
        for key in ["user:1", "user:2", "order:1"] {
            cache.set(key, "x", Duration::from_secs(60)).await.unwrap();
        }

        let mut keys = cache.scan_native("user:*", 100).await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["user:1", "user:2"]);

        let limited = cache.scan_native("*", 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_get_many_preserves_order() {
        let cache = MemoryPrimaryCache::new();
        cache.set("a", "1", Duration::from_secs(60)).await.unwrap();
        cache.set("c", "3", Duration::from_secs(60)).await.unwrap();

        let keys = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let values = cache.get_many(&keys).await.unwrap();
        assert_eq!(
            values,
            vec![Some("1".to_string()), None, Some("3".to_string())]
        );
    }

    #[tokio::test]
    async fn test_delete_batches_recorded() {
        let cache = MemoryPrimaryCache::new();
        cache.set("a", "1", Duration::from_secs(60)).await.unwrap();
        cache
            .del_batch(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();

        assert_eq!(cache.delete_batches(), vec![2]);
        assert!(cache.get("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_injected_delete_failure() {
        let cache = MemoryPrimaryCache::new();
        cache.fail_deletes_after(1);

        assert!(cache.del_batch(&["a".to_string()]).await.is_ok());
        assert!(cache.del_batch(&["b".to_string()]).await.is_err());
        assert_eq!(cache.delete_batches(), vec![1]);
    }

    #[tokio::test]
    async fn test_unavailable_and_close() {
        let cache = MemoryPrimaryCache::new();
        cache.set_available(false);
        assert!(cache.get("k").await.is_err());
        cache.set_available(true);
        assert!(cache.get("k").await.is_ok());

        cache.close().await;
        cache.close().await;
        assert!(cache.is_closed());
        assert!(cache.count().await.is_err());
    }
}
