use std::time::Duration;

use time::OffsetDateTime;

/// Current wall-clock time as Unix epoch seconds.
pub fn now_epoch() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

/// Epoch seconds `ttl` after `from`, saturating on overflow.
pub fn epoch_after(from: i64, ttl: Duration) -> i64 {
    let secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
    from.saturating_add(secs)
}
