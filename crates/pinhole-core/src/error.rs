use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid short url: {0}")]
    InvalidShortUrl(String),
    #[error("short url does not fit in 64 bits: {0}")]
    Overflow(String),
}

/// Errors raised by a reservation or mapping store backend.
///
/// A conditional write whose version check fails is *not* an error; store
/// methods report it through their return value so callers can retry.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("item already exists: {0}")]
    Conflict(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("storage operation failed: {0}")]
    Operation(String),
}
