use crate::error::{MappingError, Result, SagaStep};
use crate::reservation_client::ReservationClient;
use pinhole_core::{
    retry_contended, CallerOrigin, MappingFilter, MappingStore, RetryPolicy, ShortUrl,
    ShortUrlMapping, StorageError,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use typed_builder::TypedBuilder;

#[derive(Debug, Clone, TypedBuilder)]
pub struct MappingServiceConfig {
    /// Upper bound on the mapping write that follows a reservation.
    #[builder(default = Duration::from_secs(5))]
    pub store_timeout: Duration,
    /// Policy of the long URL update and mapping delete loops.
    #[builder(default)]
    pub update_retry: RetryPolicy,
}

impl Default for MappingServiceConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Owns the mapping table and keeps it in step with the reservation pool.
///
/// Creating a mapping reserves a short URL first and writes the mapping
/// second; deleting one releases the reservation first and removes the
/// mapping second. There is no transaction spanning both stores. When the
/// second step fails after the first committed, the operation reports
/// [`MappingError::InconsistentState`] and leaves the rows as they are.
#[derive(Debug)]
pub struct MappingService<M, R> {
    store: Arc<M>,
    reservations: Arc<R>,
    config: MappingServiceConfig,
}

impl<M, R> Clone for MappingService<M, R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            reservations: Arc::clone(&self.reservations),
            config: self.config.clone(),
        }
    }
}

fn require_local(origin: CallerOrigin) -> Result<()> {
    if origin.is_local() {
        Ok(())
    } else {
        Err(MappingError::NotOnLocalMachine)
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

impl<M: MappingStore, R: ReservationClient> MappingService<M, R> {
    pub fn new(store: M, reservations: R, config: MappingServiceConfig) -> Self {
        Self::from_shared(Arc::new(store), Arc::new(reservations), config)
    }

    pub fn from_shared(store: Arc<M>, reservations: Arc<R>, config: MappingServiceConfig) -> Self {
        Self {
            store,
            reservations,
            config,
        }
    }

    pub fn store(&self) -> &M {
        &self.store
    }

    /// Drops and recreates the mapping table. Local callers only.
    pub async fn initialize(&self, origin: CallerOrigin) -> Result<()> {
        require_local(origin)?;
        self.store.recreate().await?;
        info!("mapping table initialized");
        Ok(())
    }

    /// Reserves a short URL and maps it to `long_url`.
    ///
    /// With `short_url` set, that exact short URL is reserved; otherwise any
    /// available one is taken.
    pub async fn create_mapping(
        &self,
        short_url: Option<&str>,
        long_url: &str,
        origin: CallerOrigin,
    ) -> Result<ShortUrlMapping> {
        if is_blank(long_url) {
            return Err(MappingError::NoLongUrlSpecified);
        }

        let requested = short_url
            .map(|raw| {
                ShortUrl::new(raw).map_err(|_| MappingError::ShortUrlNotValid(raw.to_string()))
            })
            .transpose()?;

        let short_url = match requested {
            Some(short_url) => {
                self.reservations
                    .reserve_specific(&short_url, origin)
                    .await
                    .map_err(|e| MappingError::from_reserve(e, Some(&short_url)))?;
                short_url
            }
            None => self
                .reservations
                .reserve_any(origin)
                .await
                .map_err(|e| MappingError::from_reserve(e, None))?,
        };
        debug!(short_url = %short_url, "short url reserved, writing mapping");

        let mapping = ShortUrlMapping::new(short_url.clone(), long_url);
        match timeout(self.config.store_timeout, self.store.insert(&mapping)).await {
            Ok(Ok(written)) => {
                info!(short_url = %short_url, long_url, "mapping created");
                Ok(written)
            }
            Ok(Err(StorageError::Conflict(_))) => {
                error!(
                    short_url = %short_url,
                    "reserved short url already has a mapping"
                );
                Err(MappingError::ShortUrlAlreadyTaken(short_url))
            }
            Ok(Err(err)) => Err(inconsistent(short_url, SagaStep::WriteMapping, err.to_string())),
            Err(_) => Err(inconsistent(
                short_url,
                SagaStep::WriteMapping,
                format!(
                    "mapping write did not finish within {:?}",
                    self.config.store_timeout
                ),
            )),
        }
    }

    /// Looks mappings up by short URL, long URL, both, or neither.
    ///
    /// An empty filter returns every mapping ordered by short URL; any other
    /// filter that matches nothing is an error naming what was missing.
    pub async fn get_mappings(&self, filter: &MappingFilter) -> Result<Vec<ShortUrlMapping>> {
        match (&filter.short_url, &filter.long_url) {
            (None, None) => {
                let mut rows = self.store.scan().await?;
                rows.sort_by_key(|row| row.short_url.decode());
                Ok(rows)
            }
            (Some(short_url), None) => self
                .store
                .get(short_url)
                .await?
                .map(|row| vec![row])
                .ok_or_else(|| MappingError::NoSuchShortUrl(short_url.clone())),
            (None, Some(long_url)) => {
                let rows = self.store.find_by_long_url(long_url).await?;
                if rows.is_empty() {
                    return Err(MappingError::NoSuchLongUrl(long_url.clone()));
                }
                Ok(rows)
            }
            (Some(short_url), Some(long_url)) => self
                .store
                .get(short_url)
                .await?
                .filter(|row| filter.matches(row))
                .map(|row| vec![row])
                .ok_or_else(|| MappingError::NoSuchMapping {
                    short_url: short_url.clone(),
                    long_url: long_url.clone(),
                }),
        }
    }

    /// Points `short_url` at `new_long_url`, retrying lost version checks.
    pub async fn update_long_url(
        &self,
        short_url: &ShortUrl,
        new_long_url: &str,
    ) -> Result<ShortUrlMapping> {
        if is_blank(new_long_url) {
            return Err(MappingError::NoLongUrlSpecified);
        }

        let updated = retry_contended(&self.config.update_retry, move || {
            self.try_update_long_url(short_url, new_long_url)
        })
        .await?;
        info!(
            short_url = %short_url,
            long_url = new_long_url,
            version = updated.version,
            "long url changed"
        );
        Ok(updated)
    }

    async fn try_update_long_url(
        &self,
        short_url: &ShortUrl,
        new_long_url: &str,
    ) -> Result<Option<ShortUrlMapping>> {
        let current = self
            .store
            .get(short_url)
            .await?
            .ok_or_else(|| MappingError::NoSuchShortUrl(short_url.clone()))?;

        Ok(self
            .store
            .update_if_version(&current.with_long_url(new_long_url))
            .await?)
    }

    /// Releases the reservation of `short_url` and removes its mapping.
    ///
    /// If the release fails the mapping is kept.
    pub async fn delete_mapping(
        &self,
        short_url: &ShortUrl,
        origin: CallerOrigin,
    ) -> Result<ShortUrlMapping> {
        if self.store.get(short_url).await?.is_none() {
            return Err(MappingError::NoSuchShortUrl(short_url.clone()));
        }

        if let Err(err) = self.reservations.cancel_specific(short_url, origin).await {
            let err = MappingError::from_cancel(err, short_url);
            warn!(short_url = %short_url, error = %err, "reservation not released, mapping kept");
            return Err(err);
        }

        match retry_contended(&self.config.update_retry, move || self.try_delete(short_url)).await
        {
            Ok(deleted) => {
                info!(short_url = %short_url, "mapping deleted");
                Ok(deleted)
            }
            Err(err) => Err(inconsistent(
                short_url.clone(),
                SagaStep::DeleteMapping,
                err.to_string(),
            )),
        }
    }

    async fn try_delete(&self, short_url: &ShortUrl) -> Result<Option<ShortUrlMapping>> {
        let current = self
            .store
            .get(short_url)
            .await?
            .ok_or_else(|| MappingError::NoSuchShortUrl(short_url.clone()))?;

        let deleted = self.store.delete_if_version(&current).await?;
        Ok(deleted.then_some(current))
    }

    /// Deletes every mapping, in short URL order. Local callers only.
    ///
    /// Stops at the first mapping that cannot be deleted and returns its
    /// error; mappings deleted before it stay deleted.
    pub async fn delete_all(&self, origin: CallerOrigin) -> Result<Vec<ShortUrlMapping>> {
        require_local(origin)?;

        let mut rows = self.store.scan().await?;
        rows.sort_by_key(|row| row.short_url.decode());

        let mut deleted = Vec::with_capacity(rows.len());
        for row in rows {
            deleted.push(self.delete_mapping(&row.short_url, origin).await?);
        }
        info!(count = deleted.len(), "all mappings deleted");
        Ok(deleted)
    }
}

fn inconsistent(short_url: ShortUrl, step: SagaStep, detail: String) -> MappingError {
    error!(
        short_url = %short_url,
        step = %step,
        detail = %detail,
        "mapping saga left the stores inconsistent"
    );
    MappingError::InconsistentState {
        short_url,
        step,
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reservation_client::{ClientResult, LocalReservationClient, ReservationClientError};
    use async_trait::async_trait;
    use pinhole_core::store::Result as StoreResult;
    use pinhole_core::MappingReader;
    use pinhole_reservation::ReservationService;
    use pinhole_storage::{InMemoryMappingStore, InMemoryReservationStore};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};

    type Pool = ReservationService<InMemoryReservationStore>;
    type Local = LocalReservationClient<InMemoryReservationStore>;

    const LOCAL: CallerOrigin = CallerOrigin::Local;
    const REMOTE: CallerOrigin = CallerOrigin::Remote;

    async fn pool(min: u64, max: u64) -> Pool {
        let pool = ReservationService::new(InMemoryReservationStore::new());
        pool.initialize(min, max).await.unwrap();
        pool
    }

    fn service_over<M: MappingStore>(store: M, pool: &Pool) -> MappingService<M, Local> {
        MappingService::new(
            store,
            LocalReservationClient::new(pool.clone()),
            MappingServiceConfig::default(),
        )
    }

    async fn is_reserved(pool: &Pool, short_url: &ShortUrl) -> bool {
        !pool.get_one(short_url).await.unwrap().is_available()
    }

    /// Mapping store with injectable faults.
    #[derive(Default)]
    struct FaultyStore {
        inner: InMemoryMappingStore,
        fail_insert: bool,
        slow_insert: Option<Duration>,
        fail_delete: bool,
        /// Lets another writer commit just before the next conditional update.
        race_next_update: AtomicBool,
    }

    #[async_trait]
    impl MappingReader for FaultyStore {
        async fn get(&self, short_url: &ShortUrl) -> StoreResult<Option<ShortUrlMapping>> {
            self.inner.get(short_url).await
        }

        async fn find_by_long_url(&self, long_url: &str) -> StoreResult<Vec<ShortUrlMapping>> {
            self.inner.find_by_long_url(long_url).await
        }

        async fn scan(&self) -> StoreResult<Vec<ShortUrlMapping>> {
            self.inner.scan().await
        }
    }

    #[async_trait]
    impl MappingStore for FaultyStore {
        async fn recreate(&self) -> StoreResult<()> {
            self.inner.recreate().await
        }

        async fn insert(&self, mapping: &ShortUrlMapping) -> StoreResult<ShortUrlMapping> {
            if let Some(delay) = self.slow_insert {
                tokio::time::sleep(delay).await;
            }
            if self.fail_insert {
                return Err(StorageError::Unavailable("mapping table offline".to_string()));
            }
            self.inner.insert(mapping).await
        }

        async fn update_if_version(
            &self,
            mapping: &ShortUrlMapping,
        ) -> StoreResult<Option<ShortUrlMapping>> {
            if self.race_next_update.swap(false, Ordering::SeqCst) {
                if let Some(current) = self.inner.get(&mapping.short_url).await? {
                    self.inner
                        .update_if_version(&current.with_long_url("https://interloper.example"))
                        .await?;
                }
            }
            self.inner.update_if_version(mapping).await
        }

        async fn delete_if_version(&self, mapping: &ShortUrlMapping) -> StoreResult<bool> {
            if self.fail_delete {
                return Err(StorageError::Timeout("delete timed out".to_string()));
            }
            self.inner.delete_if_version(mapping).await
        }
    }

    /// A reservation service that cannot be reached.
    struct Unreachable;

    #[async_trait]
    impl ReservationClient for Unreachable {
        async fn reserve_any(&self, _origin: CallerOrigin) -> ClientResult<ShortUrl> {
            Err(ReservationClientError::Unknown("connection refused".to_string()))
        }

        async fn reserve_specific(&self, _: &ShortUrl, _: CallerOrigin) -> ClientResult<()> {
            Err(ReservationClientError::Unknown("connection refused".to_string()))
        }

        async fn cancel_specific(&self, _: &ShortUrl, _: CallerOrigin) -> ClientResult<()> {
            Err(ReservationClientError::Timeout("no answer".to_string()))
        }
    }

    #[tokio::test]
    async fn create_without_short_url_on_empty_pool() {
        let pool = ReservationService::new(InMemoryReservationStore::new());
        let service = service_over(InMemoryMappingStore::new(), &pool);

        let err = service
            .create_mapping(None, "https://example.com", REMOTE)
            .await
            .unwrap_err();
        assert!(matches!(err, MappingError::NoShortUrlAvailable));
        assert!(service.store().scan().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_with_short_url_outside_the_pool() {
        let pool = pool(0, 5).await;
        let service = service_over(InMemoryMappingStore::new(), &pool);

        let err = service
            .create_mapping(Some("7"), "https://example.com", REMOTE)
            .await
            .unwrap_err();
        assert!(matches!(err, MappingError::ShortUrlNotValid(_)));
    }

    #[tokio::test]
    async fn malformed_short_url_is_rejected_before_reserving() {
        let service = MappingService::new(
            InMemoryMappingStore::new(),
            Unreachable,
            MappingServiceConfig::default(),
        );

        for raw in ["", "0a", "has space", "aaaaaaaaaaaa"] {
            let err = service
                .create_mapping(Some(raw), "https://example.com", REMOTE)
                .await
                .unwrap_err();
            assert!(matches!(err, MappingError::ShortUrlNotValid(_)), "{raw:?}");
        }
    }

    #[tokio::test]
    async fn blank_long_url_is_rejected() {
        let pool = pool(0, 5).await;
        let service = service_over(InMemoryMappingStore::new(), &pool);

        for long_url in ["", "   "] {
            let err = service
                .create_mapping(None, long_url, REMOTE)
                .await
                .unwrap_err();
            assert!(matches!(err, MappingError::NoLongUrlSpecified));
        }
        assert_eq!(pool.get_all().await.unwrap().iter().filter(|r| r.is_available()).count(), 6);
    }

    #[tokio::test]
    async fn create_reserves_then_writes() {
        let pool = pool(10, 10).await;
        let service = service_over(InMemoryMappingStore::new(), &pool);

        let mapping = service
            .create_mapping(None, "https://example.com", REMOTE)
            .await
            .unwrap();
        assert_eq!(mapping.short_url, ShortUrl::encode(10));
        assert_eq!(mapping.version, 1);
        assert!(is_reserved(&pool, &mapping.short_url).await);

        let err = service
            .create_mapping(Some("a"), "https://other.example", REMOTE)
            .await
            .unwrap_err();
        assert!(matches!(err, MappingError::ShortUrlAlreadyTaken(_)));
    }

    #[tokio::test]
    async fn failed_mapping_write_leaves_the_short_url_reserved() {
        let pool = pool(0, 0).await;
        let store = FaultyStore {
            fail_insert: true,
            ..FaultyStore::default()
        };
        let service = service_over(store, &pool);

        let err = service
            .create_mapping(None, "https://example.com", REMOTE)
            .await
            .unwrap_err();
        match err {
            MappingError::InconsistentState {
                short_url, step, ..
            } => {
                assert_eq!(short_url, ShortUrl::encode(0));
                assert_eq!(step, SagaStep::WriteMapping);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(is_reserved(&pool, &ShortUrl::encode(0)).await);
    }

    #[tokio::test]
    async fn timed_out_mapping_write_is_inconsistent() {
        let pool = pool(0, 0).await;
        let store = FaultyStore {
            slow_insert: Some(Duration::from_secs(30)),
            ..FaultyStore::default()
        };
        let config = MappingServiceConfig::builder()
            .store_timeout(Duration::from_millis(20))
            .build();
        let service =
            MappingService::new(store, LocalReservationClient::new(pool.clone()), config);

        let err = service
            .create_mapping(Some("0"), "https://example.com", REMOTE)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MappingError::InconsistentState {
                step: SagaStep::WriteMapping,
                ..
            }
        ));
        assert!(is_reserved(&pool, &ShortUrl::encode(0)).await);
    }

    #[tokio::test]
    async fn unreachable_reservation_service_is_unknown() {
        let service = MappingService::new(
            InMemoryMappingStore::new(),
            Unreachable,
            MappingServiceConfig::default(),
        );

        let err = service
            .create_mapping(None, "https://example.com", REMOTE)
            .await
            .unwrap_err();
        assert!(matches!(err, MappingError::UnknownReservationError(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_creators_never_share_a_short_url() {
        let pool = pool(0, 49).await;
        let service = service_over(InMemoryMappingStore::new(), &pool);

        let tasks: Vec<_> = (0..64)
            .map(|i| {
                let service = service.clone();
                tokio::spawn(async move {
                    service
                        .create_mapping(None, &format!("https://example.com/{i}"), REMOTE)
                        .await
                })
            })
            .collect();

        let mut created = HashSet::new();
        let mut exhausted = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(mapping) => assert!(created.insert(mapping.short_url)),
                Err(MappingError::NoShortUrlAvailable) => exhausted += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(created.len(), 50);
        assert_eq!(exhausted, 14);
        assert_eq!(service.store().scan().await.unwrap().len(), 50);
    }

    #[tokio::test]
    async fn get_mappings_by_filter() {
        let pool = pool(0, 20).await;
        let service = service_over(InMemoryMappingStore::new(), &pool);
        for (short_url, long_url) in [("3", "https://a.example"), ("1", "https://a.example"), ("2", "https://b.example")] {
            service
                .create_mapping(Some(short_url), long_url, REMOTE)
                .await
                .unwrap();
        }

        let all = service.get_mappings(&MappingFilter::default()).await.unwrap();
        let keys: Vec<_> = all.iter().map(|m| m.short_url.as_str()).collect();
        assert_eq!(keys, ["1", "2", "3"]);

        let by_long = service
            .get_mappings(&MappingFilter {
                long_url: Some("https://a.example".to_string()),
                ..MappingFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(by_long.len(), 2);

        let both = MappingFilter {
            short_url: Some(ShortUrl::encode(2)),
            long_url: Some("https://a.example".to_string()),
        };
        assert!(matches!(
            service.get_mappings(&both).await.unwrap_err(),
            MappingError::NoSuchMapping { .. }
        ));

        let missing_short = MappingFilter {
            short_url: Some(ShortUrl::encode(9)),
            ..MappingFilter::default()
        };
        assert!(matches!(
            service.get_mappings(&missing_short).await.unwrap_err(),
            MappingError::NoSuchShortUrl(_)
        ));

        let missing_long = MappingFilter {
            long_url: Some("https://c.example".to_string()),
            ..MappingFilter::default()
        };
        assert!(matches!(
            service.get_mappings(&missing_long).await.unwrap_err(),
            MappingError::NoSuchLongUrl(_)
        ));
    }

    #[tokio::test]
    async fn update_retries_after_losing_a_race() {
        let pool = pool(0, 20).await;
        let service = service_over(FaultyStore::default(), &pool);
        let key = ShortUrl::encode(10);
        service
            .create_mapping(Some("a"), "https://v1.example", REMOTE)
            .await
            .unwrap();

        service.store().race_next_update.store(true, Ordering::SeqCst);
        let updated = service
            .update_long_url(&key, "https://v2.example")
            .await
            .unwrap();

        assert_eq!(updated.long_url, "https://v2.example");
        assert_eq!(updated.version, 3);
        let stored = service.store().get(&key).await.unwrap().unwrap();
        assert_eq!(stored, updated);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_updates_both_succeed() {
        let pool = pool(0, 20).await;
        let service = service_over(InMemoryMappingStore::new(), &pool);
        let key = ShortUrl::encode(10);
        service
            .create_mapping(Some("a"), "https://v1.example", REMOTE)
            .await
            .unwrap();

        let tasks: Vec<_> = ["https://x.example", "https://y.example"]
            .into_iter()
            .map(|long_url| {
                let service = service.clone();
                let key = key.clone();
                tokio::spawn(async move { service.update_long_url(&key, long_url).await })
            })
            .collect();

        let mut written = Vec::new();
        for task in tasks {
            written.push(task.await.unwrap().unwrap());
        }
        written.sort_by_key(|mapping| mapping.version);
        let versions: Vec<_> = written.iter().map(|mapping| mapping.version).collect();
        assert_eq!(versions, [2, 3]);
        assert_ne!(written[0].long_url, written[1].long_url);

        // The writer that retried after losing the race wrote last.
        let stored = service.store().get(&key).await.unwrap().unwrap();
        assert_eq!(stored, written[1]);
    }

    #[tokio::test]
    async fn update_of_missing_or_blank() {
        let pool = pool(0, 20).await;
        let service = service_over(InMemoryMappingStore::new(), &pool);

        assert!(matches!(
            service
                .update_long_url(&ShortUrl::encode(4), "https://x.example")
                .await
                .unwrap_err(),
            MappingError::NoSuchShortUrl(_)
        ));
        assert!(matches!(
            service.update_long_url(&ShortUrl::encode(4), " ").await.unwrap_err(),
            MappingError::NoLongUrlSpecified
        ));
    }

    #[tokio::test]
    async fn delete_releases_then_removes() {
        let pool = pool(0, 20).await;
        let service = service_over(InMemoryMappingStore::new(), &pool);
        let key = ShortUrl::encode(10);
        service
            .create_mapping(Some("a"), "https://example.com", REMOTE)
            .await
            .unwrap();

        let deleted = service.delete_mapping(&key, REMOTE).await.unwrap();
        assert_eq!(deleted.long_url, "https://example.com");
        assert!(!is_reserved(&pool, &key).await);
        assert!(service.store().get(&key).await.unwrap().is_none());

        assert!(matches!(
            service.delete_mapping(&key, REMOTE).await.unwrap_err(),
            MappingError::NoSuchShortUrl(_)
        ));

        // The released short URL can be mapped again.
        service
            .create_mapping(Some("a"), "https://again.example", REMOTE)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn failed_release_keeps_the_mapping() {
        let store = InMemoryMappingStore::new();
        let key = ShortUrl::encode(10);
        store
            .insert(&ShortUrlMapping::new(key.clone(), "https://example.com"))
            .await
            .unwrap();
        let service = MappingService::new(store, Unreachable, MappingServiceConfig::default());

        let err = service.delete_mapping(&key, REMOTE).await.unwrap_err();
        assert!(matches!(err, MappingError::UnknownReservationError(_)));
        assert!(service.store().get(&key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn releasing_an_unreserved_short_url_is_not_in_use() {
        let pool = pool(0, 20).await;
        let store = InMemoryMappingStore::new();
        let key = ShortUrl::encode(10);
        store
            .insert(&ShortUrlMapping::new(key.clone(), "https://example.com"))
            .await
            .unwrap();
        let service = service_over(store, &pool);

        let err = service.delete_mapping(&key, REMOTE).await.unwrap_err();
        assert!(matches!(err, MappingError::ShortUrlNotInUse(_)));
        assert!(service.store().get(&key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn failed_removal_after_release_is_inconsistent() {
        let pool = pool(0, 20).await;
        let store = FaultyStore {
            fail_delete: true,
            ..FaultyStore::default()
        };
        let service = service_over(store, &pool);
        let key = ShortUrl::encode(10);
        service
            .create_mapping(Some("a"), "https://example.com", REMOTE)
            .await
            .unwrap();

        let err = service.delete_mapping(&key, REMOTE).await.unwrap_err();
        assert!(matches!(
            err,
            MappingError::InconsistentState {
                step: SagaStep::DeleteMapping,
                ..
            }
        ));
        assert!(!is_reserved(&pool, &key).await);
        assert!(service.store().get(&key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn admin_operations_are_local_only() {
        let pool = pool(0, 20).await;
        let service = service_over(InMemoryMappingStore::new(), &pool);
        for short_url in ["1", "2", "3"] {
            service
                .create_mapping(Some(short_url), "https://example.com", REMOTE)
                .await
                .unwrap();
        }

        assert!(matches!(
            service.delete_all(REMOTE).await.unwrap_err(),
            MappingError::NotOnLocalMachine
        ));
        assert!(matches!(
            service.initialize(REMOTE).await.unwrap_err(),
            MappingError::NotOnLocalMachine
        ));
        assert_eq!(service.store().scan().await.unwrap().len(), 3);

        let deleted = service.delete_all(LOCAL).await.unwrap();
        assert_eq!(deleted.len(), 3);
        assert!(service.store().scan().await.unwrap().is_empty());
        for n in 1..=3 {
            assert!(!is_reserved(&pool, &ShortUrl::encode(n)).await);
        }

        service.initialize(LOCAL).await.unwrap();
    }

    #[tokio::test]
    async fn delete_all_stops_at_the_first_failure() {
        let pool = pool(0, 20).await;
        let store = InMemoryMappingStore::new();
        // "1" was never reserved, so its release fails.
        store
            .insert(&ShortUrlMapping::new(ShortUrl::encode(1), "https://one.example"))
            .await
            .unwrap();
        let service = service_over(store, &pool);
        service
            .create_mapping(Some("2"), "https://two.example", REMOTE)
            .await
            .unwrap();

        let err = service.delete_all(LOCAL).await.unwrap_err();
        assert!(matches!(err, MappingError::ShortUrlNotInUse(_)));
        assert_eq!(service.store().scan().await.unwrap().len(), 2);
    }
}
