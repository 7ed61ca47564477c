//! # octocache-storage
//!
//! Backend abstraction layer for the octocache client.
//!
//! This crate defines the traits and types shared by every backend. It does
//! not contain any implementations - those live in separate crates.
//!
//! ## Overview
//!
//! Cached data is split over two independently expiring entities joined by an
//! opaque identifier:
//!
//! - a **mapping** from the caller's logical key to an identifier, kept for
//!   30 days in the [`SecondaryIndex`] (durable, searchable) and mirrored in
//!   the [`PrimaryCache`] as an accelerator;
//! - a **payload** stored in the [`PrimaryCache`] under the identifier with
//!   the caller's TTL.
//!
//! ```text
//! "order:42" --(mapping, 30d)--> "7f1c..." --(payload, ttl)--> "shipped"
//! ```
//!
//! ## Implementing a backend
//!
//! ```ignore
//! use async_trait::async_trait;
//! use octocache_storage::SecondaryIndex;
//!
//! struct MyIndex;
//!
//! #[async_trait]
//! impl SecondaryIndex for MyIndex {
//!     async fn find_by_key(&self, key: &str) -> Option<String> {
//!         // Swallow and log backend errors, never propagate them
//!     }
//!     // ... other methods
//! }
//! ```

mod error;
mod traits;
mod types;

pub use error::{CacheError, ErrorCategory};
pub use traits::{PrimaryCache, SecondaryIndex};
pub use types::{
    CacheValue, DEFAULT_PAYLOAD_TTL, DELETE_BATCH_SIZE, MAPPING_KEY_PREFIX, MAPPING_TTL,
    MAX_PATTERN_RESULTS, MappingRecord,
};

/// Type alias for a cache operation result.
pub type CacheResult<T> = Result<T, CacheError>;

/// Type alias for a shared primary cache handle.
pub type DynPrimaryCache = std::sync::Arc<dyn PrimaryCache>;

/// Type alias for a shared secondary index handle.
pub type DynSecondaryIndex = std::sync::Arc<dyn SecondaryIndex>;
