//! Fragment storage backends.

pub mod memory;

/// Error type for store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The backend rejected or failed the operation.
    #[error("Store backend error: {0}")]
    Backend(String),
    /// The backend could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Trait for fragment storage backends.
///
/// Keys are opaque strings; values are serialized fragments. Implementations
/// must be safe for concurrent use and provide read-your-writes on a single
/// key. No other ordering or atomicity is required.
pub trait CacheStore: Send + Sync {
    /// Fetch a value. `Ok(None)` is a miss.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store a value, replacing any previous one.
    fn set(&self, key: &str, value: String) -> Result<(), StoreError>;

    /// Remove a value. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Remove every value whose key starts with `prefix`.
    ///
    /// Returns `Ok(None)` when the backend cannot delete by prefix; callers
    /// then fall back to deleting each key individually.
    fn delete_prefix(&self, _prefix: &str) -> Result<Option<usize>, StoreError> {
        Ok(None)
    }
}

pub use memory::{InMemoryCacheStore, MemoryStoreConfig, StoreStats};
