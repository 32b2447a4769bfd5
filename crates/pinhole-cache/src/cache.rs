use crate::Result;
use async_trait::async_trait;
use pinhole_core::ShortUrl;
use std::future::Future;

/// A cache of resolved long URLs, keyed by short URL.
///
/// Only positive lookups are cached. A short URL with no mapping is never
/// stored, so a mapping created later is visible on the next lookup.
#[async_trait]
pub trait MappingCache: Send + Sync + 'static {
    /// Returns `Ok(None)` if the key is not in the cache.
    async fn get(&self, short_url: &ShortUrl) -> Result<Option<String>>;

    async fn set(&self, short_url: &ShortUrl, long_url: &str) -> Result<()>;

    /// Removes the entry, if any.
    async fn del(&self, short_url: &ShortUrl) -> Result<()>;

    /// Returns the cached long URL, loading it with `fetch` on a miss.
    async fn get_or_compute<F, Fut>(&self, short_url: &ShortUrl, fetch: F) -> Result<Option<String>>
    where
        F: FnOnce(&ShortUrl) -> Fut + Send,
        Fut: Future<Output = Result<Option<String>>> + Send,
    {
        if let Some(long_url) = self.get(short_url).await? {
            return Ok(Some(long_url));
        }

        let long_url = fetch(short_url).await?;
        if let Some(ref value) = long_url {
            self.set(short_url, value).await?;
        }
        Ok(long_url)
    }
}
