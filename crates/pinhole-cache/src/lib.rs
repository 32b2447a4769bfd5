//! Read-through cache for redirect lookups.

pub mod cache;
pub mod error;
pub mod moka;

pub use cache::MappingCache;
pub use error::{CacheError, Result};
pub use moka::{MokaCacheConfig, MokaMappingCache};
