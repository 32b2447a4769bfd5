use crate::api::MappingStatus;
use crate::reservation_client::ReservationClientError;
use pinhole_cache::CacheError;
use pinhole_core::{RetriesExhausted, ShortUrl, StorageError};
use std::fmt::{Display, Formatter};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MappingError>;

/// The saga step that failed after the reservation side already committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SagaStep {
    /// Writing the mapping row after the short URL was reserved.
    WriteMapping,
    /// Deleting the mapping row after the reservation was cancelled.
    DeleteMapping,
}

impl Display for SagaStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SagaStep::WriteMapping => write!(f, "write-mapping"),
            SagaStep::DeleteMapping => write!(f, "delete-mapping"),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum MappingError {
    #[error("no long url was specified")]
    NoLongUrlSpecified,
    #[error("long url '{0}' is not an absolute http(s) url")]
    BadLongUrlSyntax(String),
    #[error("short url '{0}' is not valid")]
    ShortUrlNotValid(String),
    #[error("short url {0} is already taken")]
    ShortUrlAlreadyTaken(ShortUrl),
    #[error("no short url is available")]
    NoShortUrlAvailable,
    #[error("short url {0} is not in use")]
    ShortUrlNotInUse(ShortUrl),
    #[error("short url '{0}' was not found")]
    ShortUrlNotFound(String),
    #[error("no mapping exists for short url {0}")]
    NoSuchShortUrl(ShortUrl),
    #[error("no mapping exists for long url '{0}'")]
    NoSuchLongUrl(String),
    #[error("no mapping exists for short url {short_url} and long url '{long_url}'")]
    NoSuchMapping { short_url: ShortUrl, long_url: String },
    #[error("operation is only allowed from the local machine")]
    NotOnLocalMachine,
    #[error("reservation service error: {0}")]
    UnknownReservationError(String),
    /// The reservation side committed but the mapping side did not, or its
    /// outcome is unknown. Needs reconciliation.
    #[error("inconsistent state for short url {short_url} at step {step}: {detail}")]
    InconsistentState {
        short_url: ShortUrl,
        step: SagaStep,
        detail: String,
    },
    #[error(transparent)]
    Contention(#[from] RetriesExhausted),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl MappingError {
    pub fn status(&self) -> MappingStatus {
        match self {
            MappingError::NoLongUrlSpecified => MappingStatus::NoLongUrlSpecified,
            MappingError::BadLongUrlSyntax(_) => MappingStatus::BadLongUrlSyntax,
            MappingError::ShortUrlNotValid(_) => MappingStatus::ShortUrlNotValid,
            MappingError::ShortUrlAlreadyTaken(_) => MappingStatus::ShortUrlAlreadyTaken,
            MappingError::NoShortUrlAvailable => MappingStatus::NoShortUrlIsAvailable,
            MappingError::ShortUrlNotInUse(_) => MappingStatus::ShortUrlNotInUse,
            MappingError::ShortUrlNotFound(_) => MappingStatus::ShortUrlNotFound,
            MappingError::NoSuchShortUrl(_) => MappingStatus::NoSuchShortUrl,
            MappingError::NoSuchLongUrl(_) => MappingStatus::NoSuchLongUrl,
            MappingError::NoSuchMapping { .. } => MappingStatus::NoSuchMapping,
            MappingError::NotOnLocalMachine => MappingStatus::NotOnLocalMachine,
            MappingError::UnknownReservationError(_) => {
                MappingStatus::UnknownShortUrlReservationError
            }
            MappingError::InconsistentState { .. } => MappingStatus::InconsistentState,
            MappingError::Contention(_) => MappingStatus::ConcurrentUpdateConflict,
            MappingError::Storage(_) | MappingError::Cache(_) => {
                MappingStatus::UnknownShortUrlMappingError
            }
        }
    }

    /// Translates a failed reservation during mapping creation.
    pub(crate) fn from_reserve(err: ReservationClientError, short_url: Option<&ShortUrl>) -> Self {
        match (err, short_url) {
            (ReservationClientError::NotFound, Some(short_url)) => {
                MappingError::ShortUrlNotValid(short_url.to_string())
            }
            (ReservationClientError::Conflict, Some(short_url)) => {
                MappingError::ShortUrlAlreadyTaken(short_url.clone())
            }
            (err, _) => Self::from_client(err),
        }
    }

    /// Translates a failed cancellation during mapping deletion.
    pub(crate) fn from_cancel(err: ReservationClientError, short_url: &ShortUrl) -> Self {
        match err {
            ReservationClientError::NotFound => MappingError::ShortUrlNotFound(short_url.to_string()),
            ReservationClientError::Conflict => MappingError::ShortUrlNotInUse(short_url.clone()),
            err => Self::from_client(err),
        }
    }

    fn from_client(err: ReservationClientError) -> Self {
        match err {
            ReservationClientError::PoolExhausted => MappingError::NoShortUrlAvailable,
            ReservationClientError::NotOnLocalMachine => MappingError::NotOnLocalMachine,
            other => MappingError::UnknownReservationError(other.to_string()),
        }
    }
}
