use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use octocache_core::{IdStrategy, like_match, now_epoch};
use octocache_storage::{MAX_PATTERN_RESULTS, MappingRecord, SecondaryIndex};
use parking_lot::RwLock;

/// In-process [`SecondaryIndex`].
///
/// Records are append-only, like the SQL table: expired rows stay in place
/// and are filtered at query time.
#[derive(Debug)]
pub struct MemorySecondaryIndex {
    records: RwLock<Vec<MappingRecord>>,
    strategy: IdStrategy,
    available: AtomicBool,
    latency_ms: AtomicU64,
}

impl Default for MemorySecondaryIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySecondaryIndex {
    /// Creates an empty index minting UUID identifiers.
    pub fn new() -> Self {
        Self::with_strategy(IdStrategy::Uuid)
    }

    /// Creates an empty index minting identifiers with `strategy`.
    pub fn with_strategy(strategy: IdStrategy) -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            strategy,
            available: AtomicBool::new(true),
            latency_ms: AtomicU64::new(0),
        }
    }

    /// Simulate an outage (`false`) or recovery (`true`).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Delay every query by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        let ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.latency_ms.store(ms, Ordering::SeqCst);
    }

    /// Appends a record as-is, including already expired ones.
    pub fn insert_record(&self, record: MappingRecord) {
        self.records.write().push(record);
    }

    /// Snapshot of every stored record.
    pub fn records(&self) -> Vec<MappingRecord> {
        self.records.read().clone()
    }

    /// Waits out the simulated latency and reports availability.
    async fn reachable(&self, op: &str) -> bool {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        let up = self.available.load(Ordering::SeqCst);
        if !up {
            tracing::warn!(operation = op, "memory secondary index unavailable");
        }
        up
    }
}

#[async_trait]
impl SecondaryIndex for MemorySecondaryIndex {
    async fn find_by_key(&self, key: &str) -> Option<String> {
        if !self.reachable("find_by_key").await {
            return None;
        }
        let now = now_epoch();
        self.records
            .read()
            .iter()
            .filter(|r| r.key == key && r.is_live(now))
            .max_by_key(|r| r.created_at)
            .map(|r| r.id.clone())
    }

    async fn find_by_pattern(&self, fragment: &str) -> Vec<String> {
        if !self.reachable("find_by_pattern").await {
            return Vec::new();
        }
        let now = now_epoch();
        self.records
            .read()
            .iter()
            .filter(|r| r.is_live(now) && like_match(fragment, &r.key))
            .take(MAX_PATTERN_RESULTS)
            .map(|r| r.id.clone())
            .collect()
    }

    async fn insert(&self, key: &str) -> Option<String> {
        if !self.reachable("insert").await {
            return None;
        }
        let record = MappingRecord::new(key, self.strategy.generate(), now_epoch());
        let id = record.id.clone();
        self.records.write().push(record);
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_then_find() {
        let index = MemorySecondaryIndex::new();
        let id = index.insert("order:42").await.unwrap();

        assert_eq!(index.find_by_key("order:42").await, Some(id.clone()));
        assert_eq!(index.find_by_key("order:43").await, None);
        assert_eq!(index.find_by_pattern("order:%").await, vec![id]);
    }

    #[tokio::test]
    async fn test_expired_rows_are_filtered() {
        let index = MemorySecondaryIndex::new();
        let now = now_epoch();
        index.insert_record(MappingRecord {
            key: "user:1".into(),
            id: "dead".into(),
            created_at: now - 100,
            expires_at: now - 1,
        });

        assert_eq!(index.find_by_key("user:1").await, None);
        assert!(index.find_by_pattern("user:%").await.is_empty());
        assert_eq!(index.records().len(), 1);
    }

    #[tokio::test]
    async fn test_most_recent_live_mapping_wins() {
        let index = MemorySecondaryIndex::new();
        let now = now_epoch();
        index.insert_record(MappingRecord::new("k", "old", now - 10));
        index.insert_record(MappingRecord::new("k", "new", now));

        assert_eq!(index.find_by_key("k").await.as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_numeric_strategy() {
        let index = MemorySecondaryIndex::with_strategy(IdStrategy::Numeric);
        let id = index.insert("k").await.unwrap();
        assert!(id.parse::<u64>().is_ok());
    }

    #[tokio::test]
    async fn test_unavailable_degrades() {
        let index = MemorySecondaryIndex::new();
        index.insert("k").await.unwrap();
        index.set_available(false);

        assert_eq!(index.find_by_key("k").await, None);
        assert!(index.find_by_pattern("%").await.is_empty());
        assert_eq!(index.insert("other").await, None);
    }
}
