use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;
use octocache_client::CacheClient;
use serde_json::json;

use crate::cli::OutputFormat;
use crate::output::{print_ids, print_success, print_value, print_warning};

pub async fn get(client: &CacheClient, key: &str, format: OutputFormat) -> Result<()> {
    let value = client.get(key).await;
    if value.is_none() {
        print_warning(&format!("No value for {}", key.cyan()));
    }
    print_value(&json!({ "key": key, "value": value }), format);
    Ok(())
}

pub async fn set(
    client: &CacheClient,
    key: &str,
    value: &str,
    ttl: Option<u64>,
    format: OutputFormat,
) -> Result<()> {
    let ttl = ttl.map_or(client.default_ttl(), Duration::from_secs);
    let id = client
        .set_with_ttl(key, value, ttl)
        .await
        .with_context(|| format!("Failed to store {key}"))?;
    print_success(&format!("Stored {} as {}", key.cyan(), id.cyan()));
    print_value(
        &json!({ "key": key, "id": id, "ttl_secs": ttl.as_secs() }),
        format,
    );
    Ok(())
}

pub async fn keys(client: &CacheClient, pattern: &str, format: OutputFormat) -> Result<()> {
    let ids = client
        .keys(pattern)
        .await
        .with_context(|| format!("Pattern search failed for {pattern}"))?;
    print_ids(&ids, format);
    Ok(())
}

pub async fn clear(client: &CacheClient, pattern: &str, format: OutputFormat) -> Result<()> {
    let removed = client
        .clear(pattern)
        .await
        .with_context(|| format!("Failed to clear {pattern}"))?;
    print_success(&format!("Removed {} entries", removed.len()));
    print_ids(&removed, format);
    Ok(())
}

pub async fn del(client: &CacheClient, ids: &[String]) -> Result<()> {
    client.del(ids).await.context("Delete failed")?;
    print_success(&format!("Deleted {} identifiers", ids.len()));
    Ok(())
}

pub async fn dbsize(client: &CacheClient, format: OutputFormat) -> Result<()> {
    let size = client.dbsize().await.context("DBSIZE failed")?;
    print_value(&json!({ "dbsize": size }), format);
    Ok(())
}
