//! Redis implementation of [`PrimaryCache`] on a deadpool connection pool.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Connection, Pool};
use octocache_core::mask_url;
use octocache_storage::{CacheError, CacheResult, PrimaryCache};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};

/// Connection settings for one Redis endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379")
    pub url: String,

    /// Connection pool size
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Connection timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_pool_size() -> usize {
    10
}

fn default_timeout_ms() -> u64 {
    5000
}

impl RedisConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            pool_size: default_pool_size(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Errors raised by the Redis backend.
#[derive(Debug, thiserror::Error)]
pub enum RedisError {
    #[error("Redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    #[error("Failed to create Redis pool: {0}")]
    CreatePool(#[from] deadpool_redis::CreatePoolError),

    #[error("Redis command failed: {0}")]
    Command(#[from] redis::RedisError),
}

impl From<RedisError> for CacheError {
    fn from(err: RedisError) -> Self {
        match err {
            RedisError::CreatePool(e) => CacheError::config(e.to_string()),
            other => CacheError::primary_cache(other.to_string()),
        }
    }
}

/// [`PrimaryCache`] backed by a Redis database.
#[derive(Clone)]
pub struct RedisPrimaryCache {
    pool: Pool,
    url: String,
}

impl RedisPrimaryCache {
    /// Build a pool and check that a connection can be obtained.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be created or the first
    /// connection attempt fails.
    #[tracing::instrument(skip(config), fields(url = %mask_url(&config.url)))]
    pub async fn connect(config: &RedisConfig) -> Result<Self, RedisError> {
        let mut redis_config = deadpool_redis::Config::from_url(&config.url);
        let timeout = Duration::from_millis(config.timeout_ms);
        let pool_config = redis_config.pool.get_or_insert_with(Default::default);
        pool_config.max_size = config.pool_size;
        pool_config.timeouts.wait = Some(timeout);
        pool_config.timeouts.create = Some(timeout);
        pool_config.timeouts.recycle = Some(timeout);

        let pool = redis_config.create_pool(Some(deadpool_redis::Runtime::Tokio1))?;

        // Test connection
        drop(pool.get().await?);
        tracing::info!("Connected to Redis");

        Ok(Self {
            pool,
            url: config.url.clone(),
        })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: Pool, url: impl Into<String>) -> Self {
        Self {
            pool,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    async fn conn(&self) -> Result<Connection, RedisError> {
        Ok(self.pool.get().await?)
    }
}

impl std::fmt::Debug for RedisPrimaryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisPrimaryCache")
            .field("url", &mask_url(&self.url))
            .field("closed", &self.pool.is_closed())
            .finish()
    }
}

#[async_trait]
impl PrimaryCache for RedisPrimaryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.conn().await?;
        let value: Option<String> = conn.get(key).await.map_err(RedisError::from)?;
        Ok(value)
    }

    async fn get_many(&self, keys: &[String]) -> CacheResult<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn().await?;
        let values: Vec<Option<String>> = redis::cmd("MGET")
            .arg(keys)
            .query_async(&mut conn)
            .await
            .map_err(RedisError::from)?;
        Ok(values)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.conn().await?;
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs())
            .await
            .map_err(RedisError::from)?;
        Ok(())
    }

    async fn scan_native(&self, pattern: &str, limit: u64) -> CacheResult<Vec<String>> {
        let mut conn = self.conn().await?;
        let cap = usize::try_from(limit).unwrap_or(usize::MAX);
        let mut seen = HashSet::new();
        let mut cursor: u64 = 0;

        // SCAN may return a key more than once across iterations.
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(limit.max(1))
                .query_async(&mut conn)
                .await
                .map_err(RedisError::from)?;

            seen.extend(batch);
            cursor = next;
            if cursor == 0 || seen.len() >= cap {
                break;
            }
        }

        let mut keys: Vec<String> = seen.into_iter().collect();
        keys.truncate(cap);
        tracing::debug!(pattern = %pattern, matches = keys.len(), "native scan");
        Ok(keys)
    }

    async fn del_batch(&self, keys: &[String]) -> CacheResult<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(keys).await.map_err(RedisError::from)?;
        Ok(())
    }

    async fn count(&self) -> CacheResult<u64> {
        let mut conn = self.conn().await?;
        let size: u64 = redis::cmd("DBSIZE")
            .query_async(&mut conn)
            .await
            .map_err(RedisError::from)?;
        Ok(size)
    }

    async fn close(&self) {
        if !self.pool.is_closed() {
            self.pool.close();
            tracing::info!(url = %mask_url(&self.url), "Redis pool closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config: RedisConfig =
            serde_json::from_str(r#"{"url": "redis://cache:6379"}"#).unwrap();
        assert_eq!(config.url, "redis://cache:6379");
        assert_eq!(config.pool_size, 10);
        assert_eq!(config.timeout_ms, 5000);
    }
}
