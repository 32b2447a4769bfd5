//! Core types and traits for the Pinhole short URL allocator.
//!
//! This crate holds what both services share: the [`ShortUrl`] encoding,
//! the reservation and mapping rows, the store contracts, and the retry loop
//! used around every optimistic write.

pub mod error;
pub mod mapping;
pub mod origin;
pub mod reservation;
pub mod retry;
pub mod short_url;
pub mod store;

pub use error::{CoreError, StorageError};
pub use mapping::{MappingFilter, ShortUrlMapping};
pub use origin::CallerOrigin;
pub use reservation::ShortUrlReservation;
pub use retry::{retry_contended, RetriesExhausted, RetryPolicy};
pub use short_url::ShortUrl;
pub use store::{MappingReader, MappingStore, ReservationStore};
