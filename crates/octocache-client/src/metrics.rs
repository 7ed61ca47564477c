//! Cache counters recorded through the `metrics` facade.
//!
//! No exporter is installed here; the embedding application decides where
//! the counters go.

use metrics::counter;

/// Metric names as constants for consistency.
pub mod names {
    pub const LOOKUPS_TOTAL: &str = "octocache_lookups_total";
    pub const INDEX_FALLBACKS_TOTAL: &str = "octocache_index_fallbacks_total";
    pub const DELETED_TOTAL: &str = "octocache_deleted_total";
}

/// Record a `get` outcome.
pub fn record_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!(names::LOOKUPS_TOTAL, "result" => result).increment(1);
}

/// Record an index call that timed out or could not create a mapping.
pub fn record_index_fallback(operation: &str) {
    counter!(names::INDEX_FALLBACKS_TOTAL, "operation" => operation.to_string()).increment(1);
}

pub fn record_deleted(count: usize) {
    if count > 0 {
        counter!(names::DELETED_TOTAL).increment(count as u64);
    }
}
