//! Backend traits for the cache client.

use std::time::Duration;

use async_trait::async_trait;

use crate::CacheResult;

/// A networked key-value store with per-entry TTL.
///
/// The client holds two handles: one for mapping entries (logical key to
/// identifier) and one for payload entries (identifier to value). They may
/// point at the same or at different endpoints. Implementations must be safe
/// for concurrent use (`Send + Sync`).
#[async_trait]
pub trait PrimaryCache: Send + Sync {
    /// Reads a value. Returns `None` for absent or expired entries.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues.
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Reads many values in a single round trip, preserving input order.
    async fn get_many(&self, keys: &[String]) -> CacheResult<Vec<Option<String>>>;

    /// Writes a value with the given TTL, overwriting unconditionally.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Full keyspace scan for keys matching a glob pattern.
    ///
    /// This is O(keyspace) and only used when no secondary index is
    /// configured. `limit` bounds the per-iteration scan cost.
    async fn scan_native(&self, pattern: &str, limit: u64) -> CacheResult<Vec<String>>;

    /// Deletes a batch of keys in a single round trip.
    async fn del_batch(&self, keys: &[String]) -> CacheResult<()>;

    /// Returns the number of live entries.
    async fn count(&self) -> CacheResult<u64>;

    /// Releases the connection. Must be idempotent and must not block on a
    /// dead network.
    async fn close(&self);
}

/// Durable, queryable store of logical key to identifier mappings.
///
/// Every method is best-effort: backend failures are logged inside the
/// implementation and surface as "not found" / empty results, never as
/// errors.
#[async_trait]
pub trait SecondaryIndex: Send + Sync {
    /// Identifier of the most recent live mapping for an exact key.
    async fn find_by_key(&self, key: &str) -> Option<String>;

    /// Identifiers of live mappings whose key matches a `LIKE` fragment,
    /// capped at [`crate::MAX_PATTERN_RESULTS`].
    async fn find_by_pattern(&self, fragment: &str) -> Vec<String>;

    /// Creates a mapping record with a fresh identifier and a 30-day horizon.
    ///
    /// Returns `None` when the record could not be created; the caller then
    /// falls back to a volatile identifier.
    async fn insert(&self, key: &str) -> Option<String>;

    /// Releases the backend connection.
    async fn close(&self) {}
}
