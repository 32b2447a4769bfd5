use crate::error::{ReservationError, Result};
use pinhole_core::{retry_contended, ReservationStore, RetryPolicy, ShortUrl, ShortUrlReservation};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Allocation of short URLs from the reservation table.
///
/// Every state change is a version-checked conditional update; a lost race
/// re-reads the row and tries again under the service's [`RetryPolicy`],
/// which is unbounded by default. Nothing is locked in-process, so any
/// number of instances can share one store.
#[derive(Debug)]
pub struct ReservationService<S> {
    store: Arc<S>,
    retry: RetryPolicy,
}

impl<S> Clone for ReservationService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            retry: self.retry.clone(),
        }
    }
}

impl<S: ReservationStore> ReservationService<S> {
    pub fn new(store: S) -> Self {
        Self::from_shared(Arc::new(store))
    }

    /// Creates a service over a store that is also used elsewhere.
    pub fn from_shared(store: Arc<S>) -> Self {
        Self {
            store,
            retry: RetryPolicy::unbounded(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Recreates the pool with one available row per integer in `min..=max`.
    ///
    /// Destroys every existing reservation. Must not run under traffic.
    pub async fn initialize(&self, min: u64, max: u64) -> Result<()> {
        if min > max {
            return Err(ReservationError::InvalidRange { min, max });
        }

        self.store.recreate(min, max).await?;
        info!(min, max, "reservation pool initialized");
        Ok(())
    }

    /// Every row, ordered by the integer each short URL encodes.
    pub async fn get_all(&self) -> Result<Vec<ShortUrlReservation>> {
        let mut rows = self.store.scan().await?;
        rows.sort_by_key(|row| row.short_url.decode());
        Ok(rows)
    }

    pub async fn get_one(&self, short_url: &ShortUrl) -> Result<ShortUrlReservation> {
        self.store
            .get(short_url)
            .await?
            .ok_or_else(|| ReservationError::NotFound(short_url.clone()))
    }

    /// Reserves some available short URL and returns it.
    ///
    /// Fails with [`ReservationError::PoolExhausted`] only when the
    /// availability index is empty.
    pub async fn reserve_any(&self) -> Result<ShortUrl> {
        let short_url = retry_contended(&self.retry, move || self.try_reserve_any()).await?;
        debug!(short_url = %short_url, "reserved any");
        Ok(short_url)
    }

    async fn try_reserve_any(&self) -> Result<Option<ShortUrl>> {
        let Some(candidate) = self.store.scan_available(1).await?.into_iter().next() else {
            warn!("reservation pool exhausted");
            return Err(ReservationError::PoolExhausted);
        };

        // The index lags the table, so the candidate must be re-read.
        let Some(row) = self.store.get(&candidate).await? else {
            trace!(short_url = %candidate, "index candidate has no row");
            return Ok(None);
        };
        if !row.is_available() {
            trace!(short_url = %candidate, "index candidate already reserved");
            return Ok(None);
        }

        let written = self.store.update_if_version(&row.reserved()).await?;
        Ok(written.map(|row| row.short_url))
    }

    /// Reserves `short_url` if it exists and is available.
    pub async fn reserve_specific(&self, short_url: &ShortUrl) -> Result<ShortUrlReservation> {
        let row = retry_contended(&self.retry, move || self.try_reserve_specific(short_url)).await?;
        debug!(short_url = %short_url, version = row.version, "reserved");
        Ok(row)
    }

    async fn try_reserve_specific(
        &self,
        short_url: &ShortUrl,
    ) -> Result<Option<ShortUrlReservation>> {
        let row = self.get_one(short_url).await?;
        if !row.is_available() {
            return Err(ReservationError::AlreadyReserved(short_url.clone()));
        }
        Ok(self.store.update_if_version(&row.reserved()).await?)
    }

    /// Returns a reserved `short_url` to the pool.
    pub async fn cancel_specific(&self, short_url: &ShortUrl) -> Result<ShortUrlReservation> {
        let row = retry_contended(&self.retry, move || self.try_cancel_specific(short_url)).await?;
        debug!(short_url = %short_url, version = row.version, "reservation cancelled");
        Ok(row)
    }

    async fn try_cancel_specific(
        &self,
        short_url: &ShortUrl,
    ) -> Result<Option<ShortUrlReservation>> {
        let row = self.get_one(short_url).await?;
        if row.is_available() {
            return Err(ReservationError::NotReserved(short_url.clone()));
        }
        Ok(self.store.update_if_version(&row.released()).await?)
    }

    /// Marks every available row reserved and returns how many changed.
    ///
    /// Assumes exclusive access: a row modified after the scan aborts the
    /// operation with [`ReservationError::BulkConflict`] instead of retrying.
    pub async fn reserve_all(&self) -> Result<usize> {
        self.flip_all(false).await
    }

    /// Marks every reserved row available and returns how many changed.
    ///
    /// Same exclusivity contract as [`ReservationService::reserve_all`].
    pub async fn cancel_all(&self) -> Result<usize> {
        self.flip_all(true).await
    }

    async fn flip_all(&self, make_available: bool) -> Result<usize> {
        let mut flipped = 0;
        for row in self.store.scan().await? {
            if row.is_available() == make_available {
                continue;
            }

            let next = if make_available {
                row.released()
            } else {
                row.reserved()
            };
            if self.store.update_if_version(&next).await?.is_none() {
                warn!(short_url = %row.short_url, "bulk update lost a race");
                return Err(ReservationError::BulkConflict(row.short_url));
            }
            flipped += 1;
        }

        info!(flipped, make_available, "bulk reservation update finished");
        Ok(flipped)
    }
}
