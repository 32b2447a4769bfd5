//! Contracts of the two tables backing the allocation engine.
//!
//! Both tables expose the same primitives a partitioned key-value store
//! offers: point reads, conditional puts, version-checked conditional updates
//! and scans. Every mutation of an existing row goes through a
//! version-checked method; a failed check is reported as `Ok(None)` /
//! `Ok(false)` so callers can re-read and retry.

use crate::error::StorageError;
use crate::mapping::ShortUrlMapping;
use crate::reservation::ShortUrlReservation;
use crate::short_url::ShortUrl;
use async_trait::async_trait;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// The reservation table, keyed by short URL, with a sparse index on
/// `is_available`.
#[async_trait]
pub trait ReservationStore: Send + Sync + 'static {
    /// Drops the table if it exists, recreates it, and writes one available
    /// row for every integer in `min..=max`.
    ///
    /// Not safe to call while other operations are in flight.
    async fn recreate(&self, min: u64, max: u64) -> Result<()>;

    /// Strongly consistent point read.
    async fn get(&self, short_url: &ShortUrl) -> Result<Option<ShortUrlReservation>>;

    /// Strongly consistent scan of every row, in no particular order.
    async fn scan(&self) -> Result<Vec<ShortUrlReservation>>;

    /// Reads up to `limit` keys from the availability index.
    ///
    /// The index may lag the base table: a returned key is only a candidate
    /// and must be re-verified with [`ReservationStore::get`].
    async fn scan_available(&self, limit: usize) -> Result<Vec<ShortUrl>>;

    /// Writes `row` if the stored version still equals `row.version`.
    ///
    /// Returns the row as stored (version incremented) on success, or `None`
    /// if the row is missing or was modified since it was read.
    async fn update_if_version(
        &self,
        row: &ShortUrlReservation,
    ) -> Result<Option<ShortUrlReservation>>;
}

/// Read side of the mapping table.
#[async_trait]
pub trait MappingReader: Send + Sync + 'static {
    /// Point read on the partition key.
    async fn get(&self, short_url: &ShortUrl) -> Result<Option<ShortUrlMapping>>;

    /// Query of the `long_url` index. Long URLs are not unique.
    async fn find_by_long_url(&self, long_url: &str) -> Result<Vec<ShortUrlMapping>>;

    /// Scan of every row, in no particular order.
    async fn scan(&self) -> Result<Vec<ShortUrlMapping>>;
}

/// The mapping table, keyed by short URL, with an index on `long_url`.
#[async_trait]
pub trait MappingStore: MappingReader {
    /// Drops the table if it exists and recreates it empty.
    async fn recreate(&self) -> Result<()>;

    /// Writes a new row unless one already exists for the short URL, in which
    /// case it fails with [`StorageError::Conflict`].
    async fn insert(&self, mapping: &ShortUrlMapping) -> Result<ShortUrlMapping>;

    /// Writes `mapping` if the stored version still equals `mapping.version`.
    ///
    /// Returns the row as stored on success, or `None` if the row is missing
    /// or was modified since it was read.
    async fn update_if_version(&self, mapping: &ShortUrlMapping)
        -> Result<Option<ShortUrlMapping>>;

    /// Deletes the row if the stored version still equals `mapping.version`.
    ///
    /// Returns `false` if the row is missing or was modified since it was read.
    async fn delete_if_version(&self, mapping: &ShortUrlMapping) -> Result<bool>;
}
