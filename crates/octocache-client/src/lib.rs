//! Indirect cache client.
//!
//! Values are stored under opaque identifiers; a mapping from each logical
//! key to its identifier lives in a separate Redis namespace and, optionally,
//! in a PostgreSQL secondary index that answers glob pattern searches without
//! walking the Redis keyspace.
//!
//! ```ignore
//! use octocache_client::{config::loader::load_config, create_cache_client};
//!
//! let config = load_config(None)?;
//! let cache = create_cache_client(&config).await?;
//! let id = cache.set("order:42", "shipped").await?;
//! assert_eq!(cache.get("order:42").await.as_deref(), Some("shipped"));
//! let ids = cache.scan("order:*").await?;
//! cache.close().await;
//! ```

pub mod client;
pub mod config;
pub mod metrics;
pub mod observability;
pub mod redis;

use std::sync::Arc;

use octocache_db_postgres::PostgresSecondaryIndex;
use octocache_storage::{CacheResult, DynPrimaryCache};

pub use client::{CacheClient, CacheClientBuilder, DEFAULT_TIMEOUT, KeyIndex};
pub use config::AppConfig;
pub use octocache_core::IdStrategy;
pub use octocache_storage::{CacheError, CacheValue};
pub use redis::{RedisConfig, RedisError, RedisPrimaryCache};

/// Build a [`CacheClient`] from application configuration.
///
/// Redis connection failures are fatal. A secondary index that cannot be
/// reached degrades the client to scanning the mapping keyspace.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or a Redis endpoint is
/// unreachable.
pub async fn create_cache_client(config: &AppConfig) -> CacheResult<CacheClient> {
    config.validate().map_err(CacheError::config)?;
    let settings = &config.cache;

    let mapping: DynPrimaryCache =
        Arc::new(RedisPrimaryCache::connect(&settings.mapping_redis()).await?);
    let payload: DynPrimaryCache = if settings.shared_endpoint() {
        Arc::clone(&mapping)
    } else {
        Arc::new(RedisPrimaryCache::connect(&settings.payload_redis()).await?)
    };

    let mut builder = CacheClient::builder(mapping, payload)
        .with_id_strategy(settings.id_strategy)
        .with_timeout(settings.timeout())
        .with_default_ttl(settings.default_ttl());

    if let (Some(index_config), Some(table)) =
        (&config.secondary_index, &config.secondary_index_table)
    {
        match PostgresSecondaryIndex::connect(index_config, table, settings.id_strategy).await {
            Ok(index) => {
                builder = builder.with_index(Arc::new(index));
            }
            Err(e) => {
                let e = CacheError::from(e);
                tracing::warn!(
                    error = %e,
                    category = %e.category(),
                    "Failed to connect secondary index. Falling back to keyspace scans."
                );
            }
        }
    } else {
        tracing::info!("Secondary index disabled, pattern search scans the mapping keyspace");
    }

    let client = builder.build();
    tracing::info!(index = ?client.key_index(), "cache client ready");
    Ok(client)
}
