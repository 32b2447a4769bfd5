//! JSON wire types of the reservation service.
//!
//! Clients classify every outcome by [`ReservationStatus`]; the `message`
//! field is for humans only.

use pinhole_core::{ShortUrl, ShortUrlReservation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Success,
    ShortUrlNotFound,
    ShortUrlFoundButNotAvailable,
    ShortUrlFoundButNotReserved,
    NoShortUrlIsAvailable,
    NotOnLocalMachine,
    InvalidRange,
    BulkUpdateConflict,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializeRequest {
    pub min: u64,
    pub max: u64,
}

/// Body of every reservation service response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationResponse {
    pub status: ReservationStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_url: Option<ShortUrl>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reservations: Vec<ShortUrlReservation>,
    /// Number of rows changed by a bulk operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<usize>,
}

impl ReservationResponse {
    pub fn new(status: ReservationStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            short_url: None,
            reservations: Vec::new(),
            updated: None,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(ReservationStatus::Success, message)
    }

    pub fn with_short_url(mut self, short_url: ShortUrl) -> Self {
        self.short_url = Some(short_url);
        self
    }

    pub fn with_reservations(mut self, reservations: Vec<ShortUrlReservation>) -> Self {
        self.reservations = reservations;
        self
    }

    pub fn with_updated(mut self, updated: usize) -> Self {
        self.updated = Some(updated);
        self
    }
}
