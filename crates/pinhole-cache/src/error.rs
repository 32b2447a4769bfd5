use pinhole_core::StorageError;
use thiserror::Error;

/// Type alias for cache results.
pub type Result<T> = std::result::Result<T, CacheError>;

#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// The loader behind a read-through lookup failed.
    #[error("cache value could not be loaded: {0}")]
    Load(String),
}

impl From<StorageError> for CacheError {
    fn from(err: StorageError) -> Self {
        CacheError::Load(err.to_string())
    }
}
