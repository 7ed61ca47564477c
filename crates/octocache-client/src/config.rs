use std::time::Duration;

use octocache_core::IdStrategy;
use octocache_db_postgres::{PostgresConfig, validate_table_name};
use serde::{Deserialize, Serialize};

use crate::redis::RedisConfig;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub cache: CacheSettings,
    /// PostgreSQL secondary index. Absent means pattern search falls back to
    /// scanning the mapping keyspace.
    #[serde(default)]
    pub secondary_index: Option<PostgresConfig>,
    /// Mapping table name, required together with `secondary_index`.
    #[serde(default)]
    pub secondary_index_table: Option<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        let cache = &self.cache;
        if cache.mapping_endpoint.trim().is_empty() {
            return Err("cache.mapping_endpoint must not be empty".into());
        }
        if cache.payload_endpoint.trim().is_empty() {
            return Err("cache.payload_endpoint must not be empty".into());
        }
        if cache.pool_size == 0 {
            return Err("cache.pool_size must be > 0".into());
        }
        if cache.timeout_ms == 0 {
            return Err("cache.timeout_ms must be > 0".into());
        }
        if cache.default_ttl_secs == 0 {
            return Err("cache.default_ttl_secs must be > 0".into());
        }

        match (&self.secondary_index, &self.secondary_index_table) {
            (Some(index), Some(table)) => {
                if index.url.trim().is_empty() {
                    return Err("secondary_index.url must not be empty".into());
                }
                if index.pool_size == 0 {
                    return Err("secondary_index.pool_size must be > 0".into());
                }
                validate_table_name(table)
                    .map_err(|e| format!("secondary_index_table: {e}"))?;
            }
            (Some(_), None) => {
                return Err("secondary_index_table is required when secondary_index is set".into());
            }
            (None, Some(_)) => {
                return Err("secondary_index_table is set but secondary_index is missing".into());
            }
            (None, None) => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Redis URL holding logical key to identifier entries
    #[serde(default = "default_endpoint")]
    pub mapping_endpoint: String,
    /// Redis URL holding identifier to value entries
    #[serde(default = "default_endpoint")]
    pub payload_endpoint: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    /// Per round trip timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,
    #[serde(default)]
    pub id_strategy: IdStrategy,
}

fn default_endpoint() -> String {
    "redis://localhost:6379".to_string()
}

fn default_pool_size() -> usize {
    10
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_ttl_secs() -> u64 {
    3600
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            mapping_endpoint: default_endpoint(),
            payload_endpoint: default_endpoint(),
            pool_size: default_pool_size(),
            timeout_ms: default_timeout_ms(),
            default_ttl_secs: default_ttl_secs(),
            id_strategy: IdStrategy::default(),
        }
    }
}

impl CacheSettings {
    pub fn mapping_redis(&self) -> RedisConfig {
        self.redis_for(&self.mapping_endpoint)
    }

    pub fn payload_redis(&self) -> RedisConfig {
        self.redis_for(&self.payload_endpoint)
    }

    /// Both roles point at the same Redis URL and can share a pool.
    pub fn shared_endpoint(&self) -> bool {
        self.mapping_endpoint == self.payload_endpoint
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    fn redis_for(&self, url: &str) -> RedisConfig {
        RedisConfig {
            url: url.to_string(),
            pool_size: self.pool_size,
            timeout_ms: self.timeout_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::{Path, PathBuf};

    pub const DEFAULT_CONFIG_FILE: &str = "octocache.toml";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                let pathbuf = PathBuf::from(p);
                if !pathbuf.exists() {
                    return Err(format!("config file not found: {p}"));
                }
                builder = builder.add_source(File::from(pathbuf));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment variable overrides, e.g., OCTOCACHE__CACHE__TIMEOUT_MS=2000
        builder = builder.add_source(
            Environment::with_prefix("OCTOCACHE")
                .prefix_separator("__")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }

    pub fn load_config_with_default_path<P: AsRef<Path>>(
        path: Option<P>,
    ) -> Result<AppConfig, String> {
        let p = path
            .as_ref()
            .map(|p| p.as_ref().to_string_lossy().to_string());
        load_config(p.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::loader::load_config_with_default_path;
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.cache.shared_endpoint());
        assert_eq!(config.cache.default_ttl(), Duration::from_secs(3600));
        assert_eq!(config.cache.timeout(), Duration::from_millis(5000));
        assert_eq!(config.cache.id_strategy, IdStrategy::Uuid);
    }

    #[test]
    fn test_load_full_file() {
        let file = write_config(
            r#"
secondary_index_table = "cache_keys"

[cache]
mapping_endpoint = "redis://scan:6379"
payload_endpoint = "redis://master:6379"
pool_size = 4
timeout_ms = 250
default_ttl_secs = 60
id_strategy = "numeric"

[secondary_index]
url = "postgres://cache:cache@db/cache"
pool_size = 3

[logging]
level = "debug"
"#,
        );

        let config = load_config_with_default_path(Some(file.path())).unwrap();
        assert_eq!(config.cache.mapping_endpoint, "redis://scan:6379");
        assert_eq!(config.cache.payload_endpoint, "redis://master:6379");
        assert!(!config.cache.shared_endpoint());
        assert_eq!(config.cache.id_strategy, IdStrategy::Numeric);
        assert_eq!(config.cache.payload_redis().pool_size, 4);
        assert_eq!(config.cache.mapping_redis().timeout_ms, 250);

        let index = config.secondary_index.unwrap();
        assert_eq!(index.pool_size, 3);
        assert!(index.ensure_schema);
        assert_eq!(config.secondary_index_table.as_deref(), Some("cache_keys"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let file = write_config("[cache]\ndefault_ttl_secs = 120\n");
        let config = load_config_with_default_path(Some(file.path())).unwrap();
        assert_eq!(config.cache.default_ttl_secs, 120);
        assert_eq!(config.cache.mapping_endpoint, "redis://localhost:6379");
        assert!(config.secondary_index.is_none());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(load_config_with_default_path(Some(&missing)).is_err());
    }

    #[test]
    fn test_index_requires_table() {
        let file = write_config("[secondary_index]\nurl = \"postgres://localhost/cache\"\n");
        let err = load_config_with_default_path(Some(file.path())).unwrap_err();
        assert!(err.contains("secondary_index_table"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.cache.timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.cache.default_ttl_secs = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.secondary_index = Some(PostgresConfig::new("postgres://localhost/cache"));
        config.secondary_index_table = Some("keys; drop".into());
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.secondary_index_table = Some("cache_keys".into());
        assert!(config.validate().is_err());
    }
}
