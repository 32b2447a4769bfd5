use crate::short_url::ShortUrl;
use serde::{Deserialize, Serialize};

/// Version assigned to a row the first time it is written.
pub const INITIAL_VERSION: u64 = 1;

/// A row of the reservation table.
///
/// `is_available` is the sparse attribute behind the availability index: it
/// is present, and equal to `short_url`, exactly when the short URL is
/// unreserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortUrlReservation {
    pub short_url: ShortUrl,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_available: Option<ShortUrl>,
    pub version: u64,
}

impl ShortUrlReservation {
    /// A freshly populated, available row.
    pub fn available(short_url: ShortUrl) -> Self {
        Self {
            is_available: Some(short_url.clone()),
            short_url,
            version: INITIAL_VERSION,
        }
    }

    /// Whether the row is currently unreserved.
    ///
    /// A stale or corrupted `is_available` that does not match the key is
    /// treated as reserved.
    pub fn is_available(&self) -> bool {
        self.is_available.as_ref() == Some(&self.short_url)
    }

    /// The same row with the availability attribute cleared, keeping the
    /// version that was read so the store can check it.
    pub fn reserved(&self) -> Self {
        Self {
            short_url: self.short_url.clone(),
            is_available: None,
            version: self.version,
        }
    }

    /// The same row marked available again, keeping the version that was read.
    pub fn released(&self) -> Self {
        Self {
            short_url: self.short_url.clone(),
            is_available: Some(self.short_url.clone()),
            version: self.version,
        }
    }
}
