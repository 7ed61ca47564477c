//! Integration tests for the Redis primary cache and the full client.
//!
//! Tests use testcontainers to spin up a real Redis instance. Each test works
//! in its own Redis database so native scans and counts stay isolated.

use std::sync::Arc;
use std::time::Duration;

use octocache_client::{
    AppConfig, CacheClient, RedisConfig, RedisPrimaryCache, create_cache_client,
};
use octocache_db_memory::MemorySecondaryIndex;
use octocache_storage::PrimaryCache;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::redis::Redis;
use tokio::sync::OnceCell;

// Shared Redis container for all tests
static SHARED_REDIS: OnceCell<(ContainerAsync<Redis>, String)> = OnceCell::const_new();

/// Get or create the shared Redis container
async fn get_redis_url() -> String {
    let (_, url) = SHARED_REDIS
        .get_or_init(|| async {
            let container = Redis::default()
                .start()
                .await
                .expect("start redis container");

            let host_port = container.get_host_port_ipv4(6379).await.expect("get port");
            let url = format!("redis://127.0.0.1:{}", host_port);

            (container, url)
        })
        .await;

    url.clone()
}

async fn connect(db: u8) -> RedisPrimaryCache {
    let url = format!("{}/{db}", get_redis_url().await);
    RedisPrimaryCache::connect(&RedisConfig::new(url))
        .await
        .expect("connect redis")
}

#[tokio::test]
async fn test_primary_get_set_and_expiry() {
    let cache = connect(1).await;

    cache.set("k", "v", Duration::from_secs(60)).await.unwrap();
    assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("v"));
    assert_eq!(cache.get("missing").await.unwrap(), None);

    cache.set("short", "v", Duration::from_secs(1)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert_eq!(cache.get("short").await.unwrap(), None);
}

#[tokio::test]
async fn test_primary_get_many_preserves_order() {
    let cache = connect(2).await;
    cache.set("a", "1", Duration::from_secs(60)).await.unwrap();
    cache.set("c", "3", Duration::from_secs(60)).await.unwrap();

    let keys = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let values = cache.get_many(&keys).await.unwrap();
    assert_eq!(values, vec![Some("1".to_string()), None, Some("3".to_string())]);
    assert!(cache.get_many(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_primary_scan_count_and_delete() {
    let cache = connect(3).await;
    for i in 0..25 {
        cache
            .set(&format!("user:{i}"), "x", Duration::from_secs(60))
            .await
            .unwrap();
    }
    cache.set("order:1", "y", Duration::from_secs(60)).await.unwrap();

    let count = cache.count().await.unwrap();
    assert_eq!(count, 26);

    let mut users = cache.scan_native("user:*", count).await.unwrap();
    users.sort();
    users.dedup();
    assert_eq!(users.len(), 25);

    cache.del_batch(&users).await.unwrap();
    assert_eq!(cache.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_primary_close_is_idempotent() {
    let cache = connect(4).await;
    cache.close().await;
    cache.close().await;

    assert!(cache.pool().is_closed());
    assert!(cache.get("k").await.is_err());
}

#[tokio::test]
async fn test_connect_failure() {
    let config = RedisConfig {
        url: "redis://127.0.0.1:1".to_string(),
        pool_size: 1,
        timeout_ms: 500,
    };
    assert!(RedisPrimaryCache::connect(&config).await.is_err());
}

#[tokio::test]
async fn test_client_without_index_on_redis() {
    let mapping = Arc::new(connect(5).await);
    let payload = Arc::new(connect(6).await);
    let client = CacheClient::builder(mapping, payload).build();

    let a1 = client.set("a1", "x").await.unwrap();
    let a2 = client.set("a2", 7).await.unwrap();
    client.set("b1", "z").await.unwrap();

    assert_eq!(client.get("a2").await.as_deref(), Some("7"));
    assert_eq!(client.dbsize().await.unwrap(), 3);

    let mut found = client.keys("a*").await.unwrap();
    found.sort();
    let mut expected = vec![a1, a2];
    expected.sort();
    assert_eq!(found, expected);

    let removed = client.clear("a*").await.unwrap();
    assert_eq!(removed.len(), 2);
    assert_eq!(client.get("a1").await, None);
    assert_eq!(client.get("b1").await.as_deref(), Some("z"));

    client.close().await;
}

#[tokio::test]
async fn test_client_with_index_on_redis() {
    let mapping = Arc::new(connect(7).await);
    let payload = Arc::new(connect(8).await);
    let index = Arc::new(MemorySecondaryIndex::new());
    let client = CacheClient::builder(mapping.clone(), payload)
        .with_index(index)
        .build();

    let id = client
        .set_with_ttl("order:42", "shipped", Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(client.get("order:42").await.as_deref(), Some("shipped"));

    tokio::time::sleep(Duration::from_millis(2100)).await;

    assert_eq!(client.get("order:42").await, None);
    assert_eq!(mapping.get("mapping:order:42").await.unwrap(), Some(id.clone()));
    assert!(client.scan("order:*").await.unwrap().contains(&id));

    client.close().await;
}

#[tokio::test]
async fn test_create_cache_client_from_config() {
    let url = format!("{}/9", get_redis_url().await);
    let mut config = AppConfig::default();
    config.cache.mapping_endpoint = url.clone();
    config.cache.payload_endpoint = url;

    let client = create_cache_client(&config).await.unwrap();
    assert!(!client.key_index().is_indexed());

    // One pool serves both roles, so "k" is a logical key and a value.
    let id = client.set("k", "v").await.unwrap();
    let other = client.set("v", "k").await.unwrap();
    assert_eq!(client.get("k").await.as_deref(), Some("v"));
    assert_eq!(client.dbsize().await.unwrap(), 2);

    let mut found = client.keys("*").await.unwrap();
    found.sort();
    let mut expected = vec![id, other.clone()];
    expected.sort();
    assert_eq!(found, expected);

    client.clear("*").await.unwrap();
    assert_eq!(client.get("k").await, None);
    assert_eq!(client.set("v", "again").await.unwrap(), other);

    client.close().await;
    client.close().await;
}
