use crate::error::{MappingError, Result};
use pinhole_cache::MappingCache;
use pinhole_core::{MappingReader, ShortUrl};
use std::sync::Arc;
use tracing::{trace, warn};
use url::Url;

/// Resolves short URLs for redirects, reading through a [`MappingCache`].
#[derive(Debug)]
pub struct RedirectorService<M, C> {
    store: Arc<M>,
    cache: Arc<C>,
}

impl<M, C> Clone for RedirectorService<M, C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: Arc::clone(&self.cache),
        }
    }
}

async fn load<M: MappingReader>(
    store: Arc<M>,
    short_url: ShortUrl,
) -> pinhole_cache::Result<Option<String>> {
    trace!(short_url = %short_url, "redirect cache miss");
    let mapping = store.get(&short_url).await?;
    Ok(mapping.map(|mapping| mapping.long_url))
}

/// Accepts absolute `http`/`https` URLs that name a host.
fn redirect_target(long_url: &str) -> Option<Url> {
    let url = Url::parse(long_url).ok()?;
    let web = matches!(url.scheme(), "http" | "https");
    (web && url.host_str().is_some()).then_some(url)
}

impl<M: MappingReader, C: MappingCache> RedirectorService<M, C> {
    pub fn new(store: Arc<M>, cache: C) -> Self {
        Self {
            store,
            cache: Arc::new(cache),
        }
    }

    pub async fn resolve(&self, short_url: &ShortUrl) -> Result<Url> {
        let store = Arc::clone(&self.store);
        let long_url = self
            .cache
            .get_or_compute(short_url, move |key| load(store, key.clone()))
            .await?
            .ok_or_else(|| MappingError::ShortUrlNotFound(short_url.to_string()))?;

        redirect_target(&long_url).ok_or_else(|| {
            warn!(short_url = %short_url, long_url = %long_url, "stored long url cannot be redirected to");
            MappingError::BadLongUrlSyntax(long_url)
        })
    }

    /// Drops the cached entry so the next lookup reads the store.
    pub async fn invalidate(&self, short_url: &ShortUrl) -> Result<()> {
        self.cache.del(short_url).await?;
        Ok(())
    }
}
