//! Error types for the PostgreSQL secondary index.

use octocache_storage::CacheError;
use sqlx_core::error::Error as SqlxError;

/// PostgreSQL error code for unique violation (23505).
pub const PG_UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL error code for undefined table (42P01).
pub const PG_UNDEFINED_TABLE: &str = "42P01";

/// Checks if a sqlx error has a specific PostgreSQL error code.
pub fn has_pg_error_code(err: &SqlxError, code: &str) -> bool {
    if let SqlxError::Database(db_err) = err {
        db_err.code().as_deref() == Some(code)
    } else {
        false
    }
}

/// Checks if a sqlx error is "unique violation" (23505).
pub fn is_unique_violation(err: &SqlxError) -> bool {
    has_pg_error_code(err, PG_UNIQUE_VIOLATION)
}

/// Checks if a sqlx error is "undefined table" (42P01).
pub fn is_undefined_table(err: &SqlxError) -> bool {
    has_pg_error_code(err, PG_UNDEFINED_TABLE)
}

/// Errors specific to the PostgreSQL secondary index.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database connection or query error.
    #[error("Database connection error: {0}")]
    Connection(#[from] SqlxError),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Schema bootstrap error.
    #[error("Schema error: {message}")]
    Schema { message: String },
}

impl PostgresError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a new schema error.
    #[must_use]
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }
}

impl From<PostgresError> for CacheError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::Connection(e) => CacheError::index_unavailable(e.to_string()),
            PostgresError::Config { message } => CacheError::config(message),
            PostgresError::Schema { message } => {
                CacheError::index_unavailable(format!("Schema error: {message}"))
            }
        }
    }
}

/// Result type alias for PostgreSQL operations.
pub type Result<T> = std::result::Result<T, PostgresError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PostgresError::config("invalid table name");
        assert!(err.to_string().contains("Configuration error"));

        let err = PostgresError::schema("permission denied");
        assert!(err.to_string().contains("Schema error"));
    }

    #[test]
    fn test_conversion_to_cache_error() {
        let cache_err: CacheError = PostgresError::config("test error").into();
        assert!(matches!(cache_err, CacheError::Config { .. }));

        let cache_err: CacheError = PostgresError::schema("boom").into();
        assert!(matches!(cache_err, CacheError::IndexUnavailable { .. }));
    }

    #[test]
    fn test_non_database_errors_have_no_code() {
        let err = SqlxError::PoolTimedOut;
        assert!(!is_unique_violation(&err));
        assert!(!is_undefined_table(&err));
    }
}
