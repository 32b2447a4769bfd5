use pinhole_core::{RetriesExhausted, ShortUrl, StorageError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReservationError>;

#[derive(Debug, Clone, Error)]
pub enum ReservationError {
    #[error("short url {0} does not exist")]
    NotFound(ShortUrl),
    #[error("short url {0} is already reserved")]
    AlreadyReserved(ShortUrl),
    #[error("short url {0} is not reserved")]
    NotReserved(ShortUrl),
    #[error("no short url is available")]
    PoolExhausted,
    #[error("invalid pool range: min {min} is greater than max {max}")]
    InvalidRange { min: u64, max: u64 },
    /// A bulk flip found a row modified after it was scanned.
    #[error("short url {0} changed during a bulk update")]
    BulkConflict(ShortUrl),
    #[error(transparent)]
    Contention(#[from] RetriesExhausted),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
