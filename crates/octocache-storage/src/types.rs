//! Shared data model and constants.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Lifetime of a mapping record and of its primary cache mirror (30 days).
pub const MAPPING_TTL: Duration = Duration::from_secs(30 * 24 * 3600);

/// Namespace for mapping entries in the primary cache. Keeps them apart
/// from payloads when both roles share one keyspace.
pub const MAPPING_KEY_PREFIX: &str = "mapping:";

/// Payload TTL used when the caller does not supply one.
pub const DEFAULT_PAYLOAD_TTL: Duration = Duration::from_secs(3600);

/// Maximum number of identifiers deleted per primary cache round trip.
pub const DELETE_BATCH_SIZE: usize = 1000;

/// Maximum number of identifiers returned by an indexed pattern search.
pub const MAX_PATTERN_RESULTS: usize = 50_000;

/// A secondary index row binding a logical key to an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRecord {
    pub key: String,
    pub id: String,
    /// Creation time, epoch seconds.
    pub created_at: i64,
    /// Expiry time, epoch seconds. Rows are filtered, not deleted, once past.
    pub expires_at: i64,
}

impl MappingRecord {
    /// Create a record that lives for [`MAPPING_TTL`] starting at `now`.
    pub fn new(key: impl Into<String>, id: impl Into<String>, now: i64) -> Self {
        Self {
            key: key.into(),
            id: id.into(),
            created_at: now,
            expires_at: octocache_core::epoch_after(now, MAPPING_TTL),
        }
    }

    /// Returns `true` while `expires_at > now`.
    pub fn is_live(&self, now: i64) -> bool {
        self.expires_at > now
    }
}

/// A value accepted by `set`. Strings and numbers are stored as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheValue(String);

impl CacheValue {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CacheValue {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for CacheValue {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<&String> for CacheValue {
    fn from(value: &String) -> Self {
        Self(value.clone())
    }
}

macro_rules! impl_from_number {
    ($($t:ty),*) => {
        $(
            impl From<$t> for CacheValue {
                fn from(value: $t) -> Self {
                    Self(value.to_string())
                }
            }
        )*
    };
}

impl_from_number!(i32, i64, u32, u64, usize, f32, f64);
