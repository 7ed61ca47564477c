//! Schema management for the mapping table.
//!
//! One table holds every mapping record:
//!
//! | column        | type   | notes                            |
//! |---------------|--------|----------------------------------|
//! | `id`          | TEXT   | primary key, the identifier      |
//! | `logical_key` | TEXT   | caller key, `LIKE`-searchable     |
//! | `created_at`  | BIGINT | epoch seconds                    |
//! | `expires_at`  | BIGINT | epoch seconds, filtered on reads |
//!
//! The table is append-only; expired rows are left for external cleanup.

use std::sync::OnceLock;

use regex::Regex;
use sqlx_core::query::query;
use sqlx_postgres::PgPool;
use tracing::{info, instrument};

use crate::error::{PostgresError, Result};

/// Longest identifier PostgreSQL accepts without truncation.
const MAX_IDENTIFIER_LEN: usize = 63;

fn identifier_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"))
}

/// Validates a mapping table name and returns it lowercased.
///
/// Only plain SQL identifiers are accepted since the name is interpolated
/// into statements.
pub fn validate_table_name(table: &str) -> Result<String> {
    if table.is_empty() || table.len() > MAX_IDENTIFIER_LEN {
        return Err(PostgresError::config(format!(
            "table name must be 1..={MAX_IDENTIFIER_LEN} characters, got {:?}",
            table
        )));
    }
    if !identifier_regex().is_match(table) {
        return Err(PostgresError::config(format!(
            "table name {table:?} is not a plain SQL identifier"
        )));
    }
    Ok(table.to_lowercase())
}

/// Creates the mapping table and its lookup index if they do not exist.
///
/// Idempotent.
#[instrument(skip(pool))]
pub async fn ensure_table(pool: &PgPool, table: &str) -> Result<()> {
    let table = validate_table_name(table)?;

    let create_table = format!(
        r#"CREATE TABLE IF NOT EXISTS "{table}" (
               id TEXT PRIMARY KEY,
               logical_key TEXT NOT NULL,
               created_at BIGINT NOT NULL,
               expires_at BIGINT NOT NULL
           )"#
    );
    query(&create_table)
        .execute(pool)
        .await
        .map_err(|e| PostgresError::schema(format!("create table {table}: {e}")))?;

    // text_pattern_ops keeps prefix LIKE queries ('user:%') on the index.
    let create_index = format!(
        r#"CREATE INDEX IF NOT EXISTS "{table}_key_idx"
           ON "{table}" (logical_key text_pattern_ops, expires_at)"#
    );
    query(&create_index)
        .execute(pool)
        .await
        .map_err(|e| PostgresError::schema(format!("create index on {table}: {e}")))?;

    info!(table = %table, "Mapping table ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_table_names() {
        assert_eq!(validate_table_name("cache_keys").unwrap(), "cache_keys");
        assert_eq!(validate_table_name("CacheKeys2").unwrap(), "cachekeys2");
        assert_eq!(validate_table_name("_t").unwrap(), "_t");
    }

    #[test]
    fn test_invalid_table_names() {
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("1table").is_err());
        assert!(validate_table_name("keys; DROP TABLE x").is_err());
        assert!(validate_table_name("public.keys").is_err());
        assert!(validate_table_name(r#"a"b"#).is_err());
        assert!(validate_table_name(&"t".repeat(64)).is_err());
    }
}
