//! Error types for cache operations.
//!
//! Only write paths (`set`, `del`, `clear`) and diagnostics surface these to
//! callers. Lookups treat every backend failure as a miss.

use std::fmt;

/// Errors that can occur during cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The secondary index could not be reached or queried.
    #[error("Secondary index unavailable: {message}")]
    IndexUnavailable {
        /// Description of the failure.
        message: String,
    },

    /// The secondary index failed to create a mapping record.
    #[error("Mapping creation failed for key {key}: {message}")]
    MappingCreation {
        /// The logical key being mapped.
        key: String,
        /// Description of the failure.
        message: String,
    },

    /// A primary cache round trip failed.
    #[error("Primary cache error: {message}")]
    PrimaryCache {
        /// Description of the failure.
        message: String,
    },

    /// A batch within a bulk delete failed. Earlier batches stay deleted.
    #[error("Batch delete failed at batch {batch} after {deleted} deletions: {message}")]
    BatchDelete {
        /// Zero-based index of the failing batch.
        batch: usize,
        /// Number of identifiers deleted by earlier batches.
        deleted: usize,
        /// Description of the failure.
        message: String,
    },

    /// A backend round trip exceeded the configured timeout.
    #[error("Operation {operation} timed out after {timeout_ms}ms")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The configured timeout in milliseconds.
        timeout_ms: u64,
    },

    /// Invalid client or backend configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration problem.
        message: String,
    },
}

impl CacheError {
    /// Creates a new `IndexUnavailable` error.
    #[must_use]
    pub fn index_unavailable(message: impl Into<String>) -> Self {
        Self::IndexUnavailable {
            message: message.into(),
        }
    }

    /// Creates a new `MappingCreation` error.
    #[must_use]
    pub fn mapping_creation(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MappingCreation {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates a new `PrimaryCache` error.
    #[must_use]
    pub fn primary_cache(message: impl Into<String>) -> Self {
        Self::PrimaryCache {
            message: message.into(),
        }
    }

    /// Creates a new `BatchDelete` error.
    #[must_use]
    pub fn batch_delete(batch: usize, deleted: usize, message: impl Into<String>) -> Self {
        Self::BatchDelete {
            batch,
            deleted,
            message: message.into(),
        }
    }

    /// Creates a new `Timeout` error.
    #[must_use]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Creates a new `Config` error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if this error may have left a mutation partially applied.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        matches!(self, Self::BatchDelete { deleted, .. } if *deleted > 0)
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::IndexUnavailable { .. } | Self::MappingCreation { .. } => ErrorCategory::Index,
            Self::PrimaryCache { .. } | Self::BatchDelete { .. } => ErrorCategory::Primary,
            Self::Timeout { .. } => ErrorCategory::Timeout,
            Self::Config { .. } => ErrorCategory::Config,
        }
    }
}

/// Categories of cache errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Secondary index failure.
    Index,
    /// Primary cache failure.
    Primary,
    /// Round trip timeout.
    Timeout,
    /// Configuration problem.
    Config,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index => write!(f, "index"),
            Self::Primary => write!(f, "primary"),
            Self::Timeout => write!(f, "timeout"),
            Self::Config => write!(f, "config"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CacheError::batch_delete(2, 2000, "connection reset");
        assert_eq!(
            err.to_string(),
            "Batch delete failed at batch 2 after 2000 deletions: connection reset"
        );

        let err = CacheError::timeout("payload.set", 250);
        assert_eq!(err.to_string(), "Operation payload.set timed out after 250ms");

        let err = CacheError::mapping_creation("order:42", "duplicate");
        assert_eq!(
            err.to_string(),
            "Mapping creation failed for key order:42: duplicate"
        );
    }

    #[test]
    fn test_error_predicates() {
        assert!(CacheError::timeout("get", 10).is_timeout());
        assert!(!CacheError::primary_cache("down").is_timeout());

        assert!(CacheError::batch_delete(1, 1000, "x").is_partial());
        assert!(!CacheError::batch_delete(0, 0, "x").is_partial());
        assert!(!CacheError::primary_cache("down").is_partial());
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            CacheError::index_unavailable("down").category(),
            ErrorCategory::Index
        );
        assert_eq!(
            CacheError::batch_delete(0, 0, "x").category(),
            ErrorCategory::Primary
        );
        assert_eq!(
            CacheError::timeout("get", 1).category(),
            ErrorCategory::Timeout
        );
        assert_eq!(CacheError::config("bad").category().to_string(), "config");
    }
}
