//! In-process backends for octocache.
//!
//! [`MemoryPrimaryCache`] stands in for a networked key-value store and
//! [`MemorySecondaryIndex`] for the SQL mapping index. Both honour the same
//! contracts as the networked backends (TTL expiry, glob scans, `LIKE`
//! matching, 50k result cap) and expose switches to simulate outages and
//! latency, which makes them suitable for single-instance deployments and
//! for exercising the client's fail-open paths in tests.

mod index;
mod primary;

pub use index::MemorySecondaryIndex;
pub use primary::{CachedEntry, MemoryPrimaryCache};
