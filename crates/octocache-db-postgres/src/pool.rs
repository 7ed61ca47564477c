//! Connection pool for the mapping index.

use std::time::Duration;

use octocache_core::mask_url;
use sqlx_core::pool::PoolOptions;
use sqlx_postgres::{PgPool, Postgres};
use tracing::{debug, instrument};

use crate::config::PostgresConfig;
use crate::error::{PostgresError, Result};

/// Lifetime applied when `max_lifetime_secs` is not configured.
const DEFAULT_MAX_LIFETIME: Duration = Duration::from_secs(1800);

/// Opens a pool sized for index lookups.
///
/// Lookups are short single-statement reads, so the pool keeps a few idle
/// connections warm and never pings before handing one out.
#[instrument(skip(config), fields(url = %mask_url(&config.url), pool_size = config.pool_size))]
pub async fn create_pool(config: &PostgresConfig) -> Result<PgPool> {
    let pool = pool_options(config)?.connect(&config.url).await?;
    debug!(size = pool.size(), "index pool ready");
    Ok(pool)
}

fn pool_options(config: &PostgresConfig) -> Result<PoolOptions<Postgres>> {
    if config.pool_size == 0 {
        return Err(PostgresError::config("pool_size must be > 0"));
    }

    let warm = config
        .min_connections
        .unwrap_or(config.pool_size / 4)
        .clamp(1, config.pool_size);
    let lifetime = config
        .max_lifetime_secs
        .map_or(DEFAULT_MAX_LIFETIME, Duration::from_secs);

    Ok(PoolOptions::<Postgres>::new()
        .max_connections(config.pool_size)
        .min_connections(warm)
        .acquire_timeout(Duration::from_millis(config.connect_timeout_ms))
        .max_lifetime(lifetime)
        .idle_timeout(config.idle_timeout_ms.map(Duration::from_millis))
        .test_before_acquire(false))
}
