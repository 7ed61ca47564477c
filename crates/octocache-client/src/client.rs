//! Indirect cache client.
//!
//! ## Lookup flow
//!
//! ```text
//! get(key) → mapping cache (key → id) ──hit──────────────→ payload (id → value)
//!                  │ miss                                      ↑
//!                  └→ secondary index (key → id) ──found──────┘
//!                        │ (writes the mapping cache as a side effect)
//!                        └ not found → miss
//! ```
//!
//! ## Failure policy
//!
//! Lookups are fail-open: index and primary cache errors or timeouts become
//! misses. Writes report payload write failures, and a mapping read failure
//! the index cannot cover, so an existing mapping is never replaced blindly.
//! Mapping creation is not synchronized, so two
//! concurrent `set` calls for a fresh key may mint different identifiers;
//! the last mapping cache write wins.
//!
//! Mapping entries live under [`MAPPING_KEY_PREFIX`], so one primary cache can
//! hold both roles.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use octocache_core::{IdStrategy, sanitize_key, translate_pattern};
use octocache_storage::{
    CacheError, CacheResult, CacheValue, DEFAULT_PAYLOAD_TTL, DELETE_BATCH_SIZE, DynPrimaryCache,
    DynSecondaryIndex, MAPPING_KEY_PREFIX, MAPPING_TTL,
};

use crate::metrics;

/// Default round-trip timeout for every backend call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// How logical keys are mapped to identifiers.
///
/// Selected once at construction.
#[derive(Clone)]
pub enum KeyIndex {
    /// Mappings are recorded in a secondary index and pattern search is
    /// answered by it.
    Indexed(DynSecondaryIndex),
    /// No index: mappings only live in the mapping cache and pattern search
    /// scans its keyspace.
    Volatile,
}

impl KeyIndex {
    /// Returns `true` if a secondary index is configured.
    pub fn is_indexed(&self) -> bool {
        matches!(self, Self::Indexed(_))
    }
}

impl std::fmt::Debug for KeyIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Indexed(_) => write!(f, "Indexed"),
            Self::Volatile => write!(f, "Volatile"),
        }
    }
}

/// Builder for [`CacheClient`].
pub struct CacheClientBuilder {
    mapping: DynPrimaryCache,
    payload: DynPrimaryCache,
    index: KeyIndex,
    id_strategy: IdStrategy,
    timeout: Duration,
    default_ttl: Duration,
}

impl CacheClientBuilder {
    pub fn new(mapping: DynPrimaryCache, payload: DynPrimaryCache) -> Self {
        Self {
            mapping,
            payload,
            index: KeyIndex::Volatile,
            id_strategy: IdStrategy::default(),
            timeout: DEFAULT_TIMEOUT,
            default_ttl: DEFAULT_PAYLOAD_TTL,
        }
    }

    /// Use a secondary index for durable mappings and pattern search.
    pub fn with_index(mut self, index: DynSecondaryIndex) -> Self {
        self.index = KeyIndex::Indexed(index);
        self
    }

    /// Strategy for identifiers minted without the index.
    pub fn with_id_strategy(mut self, strategy: IdStrategy) -> Self {
        self.id_strategy = strategy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn build(self) -> CacheClient {
        CacheClient {
            mapping: self.mapping,
            payload: self.payload,
            index: self.index,
            id_strategy: self.id_strategy,
            timeout: self.timeout,
            default_ttl: self.default_ttl,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// Cache client with identifier indirection.
///
/// Cheap to clone; clones share the backend handles. Safe to call from many
/// tasks at once.
#[derive(Clone)]
pub struct CacheClient {
    mapping: DynPrimaryCache,
    payload: DynPrimaryCache,
    index: KeyIndex,
    id_strategy: IdStrategy,
    timeout: Duration,
    default_ttl: Duration,
    closed: Arc<AtomicBool>,
}

impl CacheClient {
    pub fn builder(mapping: DynPrimaryCache, payload: DynPrimaryCache) -> CacheClientBuilder {
        CacheClientBuilder::new(mapping, payload)
    }

    pub fn key_index(&self) -> &KeyIndex {
        &self.index
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Get a cached value.
    ///
    /// Returns `None` on a miss, on an expired payload behind a live mapping,
    /// and on any backend failure or timeout.
    pub async fn get(&self, key: &str) -> Option<String> {
        let id = match self.resolve(key).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                tracing::debug!(key = %key, "cache miss (no mapping)");
                metrics::record_lookup(false);
                return None;
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "mapping lookup failed, treating as miss");
                metrics::record_lookup(false);
                return None;
            }
        };

        match self.bounded("payload.get", self.payload.get(&id)).await {
            Ok(Some(value)) => {
                tracing::debug!(key = %key, id = %id, "cache hit");
                metrics::record_lookup(true);
                Some(value)
            }
            Ok(None) => {
                tracing::debug!(key = %key, id = %id, "cache miss (payload expired)");
                metrics::record_lookup(false);
                None
            }
            Err(e) => {
                tracing::warn!(key = %key, id = %id, error = %e, "payload GET failed, treating as miss");
                metrics::record_lookup(false);
                None
            }
        }
    }

    /// Store a value with the default TTL. Returns the identifier it is
    /// stored under.
    pub async fn set(&self, key: &str, value: impl Into<CacheValue>) -> CacheResult<String> {
        self.set_with_ttl(key, value, self.default_ttl).await
    }

    /// Store a value with an explicit TTL (whole seconds, at least one).
    ///
    /// # Errors
    ///
    /// Fails if the payload write fails or times out, or if no mapping could
    /// be recorded at all. Also fails when the mapping cache cannot be read
    /// and no index record answers for the key. The mapping may already exist
    /// when the payload write fails.
    pub async fn set_with_ttl(
        &self,
        key: &str,
        value: impl Into<CacheValue>,
        ttl: Duration,
    ) -> CacheResult<String> {
        if ttl.as_secs() == 0 {
            return Err(CacheError::config("ttl must be at least one second"));
        }
        let value = value.into();

        let id = match self.resolve(key).await.inspect_err(|e| {
            tracing::warn!(key = %key, error = %e, category = %e.category(), "mapping lookup failed")
        })? {
            Some(id) => id,
            None => self.mint(key).await?,
        };

        self.bounded("payload.set", self.payload.set(&id, value.as_str(), ttl))
            .await
            .inspect_err(|e| {
                tracing::warn!(key = %key, id = %id, error = %e, category = %e.category(), "payload SET failed")
            })?;

        tracing::debug!(key = %key, id = %id, ttl_secs = ttl.as_secs(), "cache set");
        Ok(id)
    }

    /// Identifiers whose logical key matches a glob pattern.
    ///
    /// With an index this is a bounded indexed query (at most 50,000 live
    /// mappings). Without one, the mapping keyspace is scanned with the
    /// current entry count as the scan bound.
    pub async fn keys(&self, pattern: &str) -> CacheResult<Vec<String>> {
        match &self.index {
            KeyIndex::Indexed(index) => {
                let fragment = translate_pattern(pattern);
                Ok(self
                    .bounded_index("index.find_by_pattern", index.find_by_pattern(&fragment))
                    .await)
            }
            KeyIndex::Volatile => self.scan_mappings(pattern).await,
        }
    }

    /// Same as [`CacheClient::keys`]; both go through the index or the
    /// cursor-based scan, never a blocking `KEYS`.
    pub async fn scan(&self, pattern: &str) -> CacheResult<Vec<String>> {
        self.keys(pattern).await
    }

    /// Delete every payload whose key matches `pattern` and return the
    /// identifiers removed. Mappings are kept.
    pub async fn clear(&self, pattern: &str) -> CacheResult<Vec<String>> {
        let ids = self.keys(pattern).await?;
        self.del(&ids).await?;
        tracing::info!(pattern = %pattern, removed = ids.len(), "cache cleared");
        Ok(ids)
    }

    /// Delete payloads by identifier in batches of 1000.
    ///
    /// # Errors
    ///
    /// Stops at the first failing batch. Batches before it stay deleted; the
    /// error reports how many identifiers were removed.
    pub async fn del(&self, ids: &[String]) -> CacheResult<()> {
        let mut deleted = 0;
        for (batch, chunk) in ids.chunks(DELETE_BATCH_SIZE).enumerate() {
            if let Err(e) = self.bounded("payload.del", self.payload.del_batch(chunk)).await {
                tracing::warn!(batch, deleted, error = %e, "batch delete failed");
                metrics::record_deleted(deleted);
                return Err(CacheError::batch_delete(batch, deleted, e.to_string()));
            }
            deleted += chunk.len();
        }
        metrics::record_deleted(deleted);
        Ok(())
    }

    /// Number of live entries in the mapping cache.
    ///
    /// When one cache holds both roles, only mapping entries are counted.
    pub async fn dbsize(&self) -> CacheResult<u64> {
        let total = self.bounded("mapping.count", self.mapping.count()).await?;
        if !self.shares_keyspace() || total == 0 {
            return Ok(total);
        }
        let pattern = format!("{MAPPING_KEY_PREFIX}*");
        let keys = self
            .bounded("mapping.scan", self.mapping.scan_native(&pattern, total))
            .await?;
        Ok(keys.len() as u64)
    }

    /// Release every backend connection.
    ///
    /// Idempotent. Gives up after the configured timeout if the network is
    /// already gone.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let release = async {
            tokio::join!(self.mapping.close(), self.payload.close(), async {
                if let KeyIndex::Indexed(index) = &self.index {
                    index.close().await;
                }
            });
        };

        if tokio::time::timeout(self.timeout, release).await.is_err() {
            tracing::warn!(
                timeout_ms = self.timeout_ms(),
                "cache client close timed out"
            );
        } else {
            tracing::info!("cache client closed");
        }
    }

    /// Resolve a logical key to its identifier: mapping cache first, then
    /// the index.
    ///
    /// A mapping cache failure is returned only when the index cannot supply
    /// the identifier instead; `Ok(None)` always means the key has no mapping.
    async fn resolve(&self, key: &str) -> CacheResult<Option<String>> {
        let cached = self
            .bounded("mapping.get", self.mapping.get(&mapping_key(key)))
            .await;
        let failure = match cached {
            Ok(Some(id)) => return Ok(Some(id)),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "mapping GET failed");
                Some(e)
            }
        };

        let KeyIndex::Indexed(index) = &self.index else {
            return failure.map_or(Ok(None), Err);
        };

        match self
            .bounded_index("index.find_by_key", index.find_by_key(&sanitize_key(key)))
            .await
        {
            Some(id) => {
                self.remember(key, &id).await;
                Ok(Some(id))
            }
            None => failure.map_or(Ok(None), Err),
        }
    }

    /// Create a mapping for a key that has none.
    ///
    /// Prefers a durable index record; falls back to a volatile identifier
    /// that only lives in the mapping cache.
    async fn mint(&self, key: &str) -> CacheResult<String> {
        if let KeyIndex::Indexed(index) = &self.index {
            if let Some(id) = self
                .bounded_index("index.insert", index.insert(&sanitize_key(key)))
                .await
            {
                self.remember(key, &id).await;
                return Ok(id);
            }
            tracing::warn!(key = %key, "mapping creation failed, using volatile identifier");
            metrics::record_index_fallback("insert");
        }

        let id = self.id_strategy.generate();
        self.bounded("mapping.set", self.mapping.set(&mapping_key(key), &id, MAPPING_TTL))
            .await
            .map_err(|e| CacheError::mapping_creation(key, e.to_string()))?;
        Ok(id)
    }

    /// Mirror an index mapping into the mapping cache. Best effort.
    async fn remember(&self, key: &str, id: &str) {
        if let Err(e) = self
            .bounded("mapping.set", self.mapping.set(&mapping_key(key), id, MAPPING_TTL))
            .await
        {
            tracing::warn!(key = %key, id = %id, error = %e, "failed to cache mapping");
        }
    }

    /// Native pattern search over the mapping keyspace, resolving each
    /// matched logical key to its identifier.
    async fn scan_mappings(&self, pattern: &str) -> CacheResult<Vec<String>> {
        let limit = self.bounded("mapping.count", self.mapping.count()).await?;
        if limit == 0 {
            return Ok(Vec::new());
        }

        let keys = self
            .bounded(
                "mapping.scan",
                self.mapping.scan_native(&mapping_key(pattern), limit),
            )
            .await?;

        let mut ids = Vec::with_capacity(keys.len());
        for chunk in keys.chunks(DELETE_BATCH_SIZE) {
            let resolved = self
                .bounded("mapping.mget", self.mapping.get_many(chunk))
                .await?;
            ids.extend(resolved.into_iter().flatten());
        }
        Ok(ids)
    }

    /// Run a primary cache call under the client timeout.
    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = CacheResult<T>>,
    ) -> CacheResult<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::timeout(operation, self.timeout_ms())),
        }
    }

    /// Run an index call under the client timeout, degrading to the empty
    /// result on expiry.
    async fn bounded_index<T: Default>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = T>,
    ) -> T {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    operation,
                    timeout_ms = self.timeout_ms(),
                    "secondary index timed out, treating as not found"
                );
                metrics::record_index_fallback(operation);
                T::default()
            }
        }
    }

    fn shares_keyspace(&self) -> bool {
        Arc::ptr_eq(&self.mapping, &self.payload)
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Primary cache key of the mapping entry for `key`.
fn mapping_key(key: &str) -> String {
    format!("{MAPPING_KEY_PREFIX}{key}")
}

impl std::fmt::Debug for CacheClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheClient")
            .field("index", &self.index)
            .field("id_strategy", &self.id_strategy)
            .field("timeout", &self.timeout)
            .field("default_ttl", &self.default_ttl)
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}
