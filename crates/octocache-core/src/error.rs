use thiserror::Error;

/// Core error types for octocache utilities
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Unknown identifier strategy: {0} (expected 'uuid' or 'numeric')")]
    UnknownIdStrategy(String),
}

impl CoreError {
    /// Create a new UnknownIdStrategy error
    pub fn unknown_id_strategy(name: impl Into<String>) -> Self {
        Self::UnknownIdStrategy(name.into())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
