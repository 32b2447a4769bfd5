use async_trait::async_trait;
use pinhole_core::{CallerOrigin, ReservationStore, ShortUrl};
use pinhole_reservation::{ReservationError, ReservationService};
use thiserror::Error;

/// Outcome of a failed call to the reservation service.
///
/// `NotFound` and `Conflict` are definitive answers from the service;
/// `Timeout` and `Unknown` mean the outcome of the call is not known.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReservationClientError {
    #[error("short url does not exist in the pool")]
    NotFound,
    #[error("short url is not in the expected reservation state")]
    Conflict,
    #[error("no short url is available")]
    PoolExhausted,
    #[error("operation is only allowed from the local machine")]
    NotOnLocalMachine,
    #[error("reservation service timed out: {0}")]
    Timeout(String),
    #[error("reservation service failed: {0}")]
    Unknown(String),
}

pub type ClientResult<T> = std::result::Result<T, ReservationClientError>;

/// The reservation operations the mapping saga depends on.
///
/// `origin` is the origin of the request that triggered the call;
/// implementations may use it to pick an endpoint.
#[async_trait]
pub trait ReservationClient: Send + Sync + 'static {
    async fn reserve_any(&self, origin: CallerOrigin) -> ClientResult<ShortUrl>;

    async fn reserve_specific(&self, short_url: &ShortUrl, origin: CallerOrigin)
        -> ClientResult<()>;

    async fn cancel_specific(&self, short_url: &ShortUrl, origin: CallerOrigin) -> ClientResult<()>;
}

impl From<ReservationError> for ReservationClientError {
    fn from(err: ReservationError) -> Self {
        match err {
            ReservationError::NotFound(_) => ReservationClientError::NotFound,
            ReservationError::AlreadyReserved(_) | ReservationError::NotReserved(_) => {
                ReservationClientError::Conflict
            }
            ReservationError::PoolExhausted => ReservationClientError::PoolExhausted,
            other => ReservationClientError::Unknown(other.to_string()),
        }
    }
}

/// Calls a [`ReservationService`] in the same process.
#[derive(Debug, Clone)]
pub struct LocalReservationClient<S> {
    service: ReservationService<S>,
}

impl<S: ReservationStore> LocalReservationClient<S> {
    pub fn new(service: ReservationService<S>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S: ReservationStore> ReservationClient for LocalReservationClient<S> {
    async fn reserve_any(&self, _origin: CallerOrigin) -> ClientResult<ShortUrl> {
        Ok(self.service.reserve_any().await?)
    }

    async fn reserve_specific(
        &self,
        short_url: &ShortUrl,
        _origin: CallerOrigin,
    ) -> ClientResult<()> {
        self.service.reserve_specific(short_url).await?;
        Ok(())
    }

    async fn cancel_specific(&self, short_url: &ShortUrl, _origin: CallerOrigin) -> ClientResult<()> {
        self.service.cancel_specific(short_url).await?;
        Ok(())
    }
}
