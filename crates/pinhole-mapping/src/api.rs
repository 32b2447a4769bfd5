//! JSON wire types of the mapping service.

use pinhole_core::ShortUrlMapping;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MappingStatus {
    Success,
    BadLongUrlSyntax,
    NoLongUrlSpecified,
    NoShortUrlIsAvailable,
    NoSuchLongUrl,
    NoSuchMapping,
    NoSuchShortUrl,
    NotOnLocalMachine,
    ShortUrlAlreadyTaken,
    ShortUrlNotInUse,
    ShortUrlNotValid,
    ShortUrlNotFound,
    UnknownShortUrlMappingError,
    UnknownShortUrlReservationError,
    InconsistentState,
    ConcurrentUpdateConflict,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMappingRequest {
    /// Asks for this specific short URL instead of any available one.
    #[serde(default)]
    pub short_url: Option<String>,
    #[serde(default)]
    pub long_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeLongUrlRequest {
    pub short_url: String,
    #[serde(default)]
    pub new_long_url: Option<String>,
}

/// Query string of `GET /get-mappings`. Both fields are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetMappingsQuery {
    #[serde(default)]
    pub short_url: Option<String>,
    #[serde(default)]
    pub long_url: Option<String>,
}

/// Body of every mapping service response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingResponse {
    pub status: MappingStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mappings: Vec<ShortUrlMapping>,
    /// Number of mappings removed by `DELETE /delete-all`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted: Option<usize>,
}

impl MappingResponse {
    pub fn new(status: MappingStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            mappings: Vec::new(),
            deleted: None,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(MappingStatus::Success, message)
    }

    pub fn with_mappings(mut self, mappings: Vec<ShortUrlMapping>) -> Self {
        self.mappings = mappings;
        self
    }

    pub fn with_deleted(mut self, deleted: usize) -> Self {
        self.deleted = Some(deleted);
        self
    }
}
