//! PostgreSQL implementation of [`SecondaryIndex`].

use async_trait::async_trait;
use octocache_core::{IdStrategy, now_epoch};
use octocache_storage::{MAX_PATTERN_RESULTS, MappingRecord, SecondaryIndex};
use sqlx_core::error::Error as SqlxError;
use sqlx_core::query_scalar::query_scalar;
use sqlx_postgres::PgPool;
use tracing::{debug, info, instrument, warn};

use crate::config::PostgresConfig;
use crate::error::{Result, is_undefined_table, is_unique_violation};
use crate::pool::create_pool;
use crate::schema::{ensure_table, validate_table_name};

/// Mapping index stored in a single PostgreSQL table.
///
/// Reads filter on `expires_at > now`; rows are never updated. All failures
/// are logged and reported as "not found" so the cache stays fail-open.
#[derive(Debug, Clone)]
pub struct PostgresSecondaryIndex {
    pool: PgPool,
    table: String,
    strategy: IdStrategy,
    find_by_key_sql: String,
    find_by_pattern_sql: String,
    insert_sql: String,
}

impl PostgresSecondaryIndex {
    /// Connects to PostgreSQL and optionally bootstraps the mapping table.
    ///
    /// # Errors
    ///
    /// Returns an error if the table name is invalid, the pool cannot be
    /// created, or schema bootstrap fails.
    #[instrument(skip(config))]
    pub async fn connect(config: &PostgresConfig, table: &str, strategy: IdStrategy) -> Result<Self> {
        let table = validate_table_name(table)?;
        let pool = create_pool(config).await?;
        if config.ensure_schema {
            ensure_table(&pool, &table).await?;
        }
        info!(table = %table, strategy = %strategy, "PostgreSQL secondary index connected");
        Self::from_pool(pool, &table, strategy)
    }

    /// Wraps an existing pool. The table must already exist.
    pub fn from_pool(pool: PgPool, table: &str, strategy: IdStrategy) -> Result<Self> {
        let table = validate_table_name(table)?;
        Ok(Self {
            find_by_key_sql: format!(
                r#"SELECT id FROM "{table}"
                   WHERE logical_key = $1 AND expires_at > $2
                   ORDER BY created_at DESC
                   LIMIT 1"#
            ),
            find_by_pattern_sql: format!(
                r#"SELECT id FROM "{table}"
                   WHERE logical_key LIKE $1 AND expires_at > $2
                   LIMIT $3"#
            ),
            insert_sql: format!(
                r#"INSERT INTO "{table}" (id, logical_key, created_at, expires_at)
                   VALUES ($1, $2, $3, $4)
                   RETURNING id"#
            ),
            pool,
            table,
            strategy,
        })
    }

    /// Returns the validated table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn log_failure(&self, operation: &str, err: &SqlxError) {
        if is_undefined_table(err) {
            warn!(table = %self.table, operation, "mapping table does not exist");
        } else if is_unique_violation(err) {
            warn!(table = %self.table, operation, "identifier collision on insert");
        } else {
            warn!(table = %self.table, operation, error = %err, "secondary index query failed");
        }
    }
}

#[async_trait]
impl SecondaryIndex for PostgresSecondaryIndex {
    async fn find_by_key(&self, key: &str) -> Option<String> {
        let result: std::result::Result<Option<String>, SqlxError> =
            query_scalar(&self.find_by_key_sql)
                .bind(key)
                .bind(now_epoch())
                .fetch_optional(&self.pool)
                .await;

        match result {
            Ok(id) => {
                debug!(key = %key, found = id.is_some(), "index lookup");
                id
            }
            Err(e) => {
                self.log_failure("find_by_key", &e);
                None
            }
        }
    }

    async fn find_by_pattern(&self, fragment: &str) -> Vec<String> {
        let result: std::result::Result<Vec<String>, SqlxError> =
            query_scalar(&self.find_by_pattern_sql)
                .bind(fragment)
                .bind(now_epoch())
                .bind(MAX_PATTERN_RESULTS as i64)
                .fetch_all(&self.pool)
                .await;

        match result {
            Ok(ids) => {
                debug!(pattern = %fragment, matches = ids.len(), "index pattern search");
                ids
            }
            Err(e) => {
                self.log_failure("find_by_pattern", &e);
                Vec::new()
            }
        }
    }

    async fn insert(&self, key: &str) -> Option<String> {
        let record = MappingRecord::new(key, self.strategy.generate(), now_epoch());

        let result: std::result::Result<String, SqlxError> = query_scalar(&self.insert_sql)
            .bind(&record.id)
            .bind(&record.key)
            .bind(record.created_at)
            .bind(record.expires_at)
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(id) => {
                debug!(key = %key, id = %id, "mapping record created");
                Some(id)
            }
            Err(e) => {
                self.log_failure("insert", &e);
                None
            }
        }
    }

    async fn close(&self) {
        if !self.pool.is_closed() {
            self.pool.close().await;
            info!(table = %self.table, "PostgreSQL secondary index closed");
        }
    }
}
