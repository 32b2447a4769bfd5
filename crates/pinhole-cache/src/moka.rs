use crate::{CacheError, MappingCache, Result};
use async_trait::async_trait;
use moka::future::Cache;
use pinhole_core::ShortUrl;
use std::future::Future;
use std::time::Duration;
use tracing::trace;
use typed_builder::TypedBuilder;

/// Sizing of a [`MokaMappingCache`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct MokaCacheConfig {
    #[builder(default = 10_000)]
    max_capacity: u64,
    /// How long an entry may be served after it was loaded.
    #[builder(default = Duration::from_secs(300))]
    time_to_live: Duration,
}

impl Default for MokaCacheConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Outcome of a single-flight load that did not produce a value.
#[derive(Debug)]
enum Miss {
    Absent,
    Failed(CacheError),
}

/// In-process [`MappingCache`] on top of [`moka`].
///
/// Entries expire after the configured TTL, which bounds how long another
/// instance's update or delete can go unnoticed here.
#[derive(Debug, Clone)]
pub struct MokaMappingCache {
    inner: Cache<ShortUrl, String>,
}

impl MokaMappingCache {
    pub fn new(config: MokaCacheConfig) -> Self {
        let inner = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(config.time_to_live)
            .build();
        Self { inner }
    }

    pub fn with_ttl(max_capacity: u64, time_to_live: Duration) -> Self {
        Self::new(
            MokaCacheConfig::builder()
                .max_capacity(max_capacity)
                .time_to_live(time_to_live)
                .build(),
        )
    }
}

impl Default for MokaMappingCache {
    fn default() -> Self {
        Self::new(MokaCacheConfig::default())
    }
}

#[async_trait]
impl MappingCache for MokaMappingCache {
    async fn get(&self, short_url: &ShortUrl) -> Result<Option<String>> {
        Ok(self.inner.get(short_url).await)
    }

    async fn set(&self, short_url: &ShortUrl, long_url: &str) -> Result<()> {
        self.inner
            .insert(short_url.clone(), long_url.to_string())
            .await;
        Ok(())
    }

    async fn del(&self, short_url: &ShortUrl) -> Result<()> {
        self.inner.invalidate(short_url).await;
        Ok(())
    }

    /// Concurrent misses on the same key share one load.
    async fn get_or_compute<F, Fut>(&self, short_url: &ShortUrl, fetch: F) -> Result<Option<String>>
    where
        F: FnOnce(&ShortUrl) -> Fut + Send,
        Fut: Future<Output = Result<Option<String>>> + Send,
    {
        let key = short_url.clone();
        let load = async move {
            match fetch(&key).await {
                Ok(Some(long_url)) => Ok(long_url),
                Ok(None) => Err(Miss::Absent),
                Err(err) => Err(Miss::Failed(err)),
            }
        };

        match self.inner.try_get_with(short_url.clone(), load).await {
            Ok(long_url) => Ok(Some(long_url)),
            Err(miss) => match miss.as_ref() {
                Miss::Absent => {
                    trace!(short_url = %short_url, "no mapping to cache");
                    Ok(None)
                }
                Miss::Failed(err) => Err(err.clone()),
            },
        }
    }
}
