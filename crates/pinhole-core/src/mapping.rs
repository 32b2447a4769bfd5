use crate::reservation::INITIAL_VERSION;
use crate::short_url::ShortUrl;
use serde::{Deserialize, Serialize};

/// A row of the mapping table: one short URL pointing at one long URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortUrlMapping {
    pub short_url: ShortUrl,
    pub long_url: String,
    pub version: u64,
}

impl ShortUrlMapping {
    /// A mapping that has not been written yet.
    pub fn new(short_url: ShortUrl, long_url: impl Into<String>) -> Self {
        Self {
            short_url,
            long_url: long_url.into(),
            version: INITIAL_VERSION,
        }
    }

    /// The same row pointing at `long_url`, keeping the version that was read.
    pub fn with_long_url(&self, long_url: impl Into<String>) -> Self {
        Self {
            short_url: self.short_url.clone(),
            long_url: long_url.into(),
            version: self.version,
        }
    }
}

/// Selects mappings by short URL, long URL, both, or neither (everything).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingFilter {
    pub short_url: Option<ShortUrl>,
    pub long_url: Option<String>,
}

impl MappingFilter {
    pub fn matches(&self, mapping: &ShortUrlMapping) -> bool {
        self.short_url
            .as_ref()
            .is_none_or(|short_url| *short_url == mapping.short_url)
            && self
                .long_url
                .as_deref()
                .is_none_or(|long_url| long_url == mapping.long_url)
    }
}
