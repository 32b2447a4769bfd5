use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use pinhole_core::reservation::INITIAL_VERSION;
use pinhole_core::store::Result;
use pinhole_core::{
    MappingReader, MappingStore, ReservationStore, ShortUrl, ShortUrlMapping, ShortUrlReservation,
    StorageError,
};
use std::collections::BTreeSet;
use tracing::{debug, trace};

/// In-memory reservation table.
///
/// Rows live in a [`DashMap`]; the sparse availability index is a separate
/// ordered set of the decoded values of available rows. A conditional write
/// updates the row first and the index second while still holding the row's
/// shard lock, so the index can lag a concurrent reader by one write but can
/// never drift from the row permanently.
#[derive(Debug, Default)]
pub struct InMemoryReservationStore {
    rows: DashMap<ShortUrl, ShortUrlReservation>,
    available: Mutex<BTreeSet<u64>>,
}

impl InMemoryReservationStore {
    /// Creates an empty reservation table.
    pub fn new() -> Self {
        Self::default()
    }

    fn sync_index(&self, row: &ShortUrlReservation) {
        let mut available = self.available.lock();
        if row.is_available() {
            available.insert(row.short_url.decode());
        } else {
            available.remove(&row.short_url.decode());
        }
    }
}

#[async_trait]
impl ReservationStore for InMemoryReservationStore {
    async fn recreate(&self, min: u64, max: u64) -> Result<()> {
        if min > max {
            return Err(StorageError::Operation(format!(
                "empty range [{min}, {max}]"
            )));
        }

        self.rows.clear();
        for value in min..=max {
            let short_url = ShortUrl::encode(value);
            self.rows
                .insert(short_url.clone(), ShortUrlReservation::available(short_url));
        }
        // Row locks are never taken while the index is held.
        *self.available.lock() = (min..=max).collect();

        debug!(min, max, "recreated in-memory reservation table");
        Ok(())
    }

    async fn get(&self, short_url: &ShortUrl) -> Result<Option<ShortUrlReservation>> {
        trace!(short_url = %short_url, "reading reservation");
        Ok(self.rows.get(short_url).map(|row| row.clone()))
    }

    async fn scan(&self) -> Result<Vec<ShortUrlReservation>> {
        Ok(self.rows.iter().map(|row| row.value().clone()).collect())
    }

    async fn scan_available(&self, limit: usize) -> Result<Vec<ShortUrl>> {
        let available = self.available.lock();
        Ok(available
            .iter()
            .take(limit)
            .map(|value| ShortUrl::encode(*value))
            .collect())
    }

    async fn update_if_version(
        &self,
        row: &ShortUrlReservation,
    ) -> Result<Option<ShortUrlReservation>> {
        let Some(mut stored) = self.rows.get_mut(&row.short_url) else {
            return Ok(None);
        };

        if stored.version != row.version {
            trace!(
                short_url = %row.short_url,
                expected = row.version,
                actual = stored.version,
                "reservation version check failed"
            );
            return Ok(None);
        }

        let written = ShortUrlReservation {
            short_url: row.short_url.clone(),
            is_available: row.is_available.clone(),
            version: row.version + 1,
        };
        *stored = written.clone();
        self.sync_index(&written);

        Ok(Some(written))
    }
}

/// In-memory mapping table backed by a [`DashMap`].
///
/// Long URL lookups scan the map; there is no separate index to maintain.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMappingStore {
    rows: DashMap<ShortUrl, ShortUrlMapping>,
}

impl InMemoryMappingStore {
    /// Creates an empty mapping table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty mapping table with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rows: DashMap::with_capacity(capacity),
        }
    }
}

#[async_trait]
impl MappingReader for InMemoryMappingStore {
    async fn get(&self, short_url: &ShortUrl) -> Result<Option<ShortUrlMapping>> {
        Ok(self.rows.get(short_url).map(|row| row.clone()))
    }

    async fn find_by_long_url(&self, long_url: &str) -> Result<Vec<ShortUrlMapping>> {
        let mut found: Vec<_> = self
            .rows
            .iter()
            .filter(|row| row.long_url == long_url)
            .map(|row| row.value().clone())
            .collect();
        found.sort_by_key(|row| row.short_url.decode());
        Ok(found)
    }

    async fn scan(&self) -> Result<Vec<ShortUrlMapping>> {
        Ok(self.rows.iter().map(|row| row.value().clone()).collect())
    }
}

#[async_trait]
impl MappingStore for InMemoryMappingStore {
    async fn recreate(&self) -> Result<()> {
        self.rows.clear();
        debug!("recreated in-memory mapping table");
        Ok(())
    }

    async fn insert(&self, mapping: &ShortUrlMapping) -> Result<ShortUrlMapping> {
        match self.rows.entry(mapping.short_url.clone()) {
            Entry::Occupied(_) => Err(StorageError::Conflict(mapping.short_url.to_string())),
            Entry::Vacant(slot) => {
                let written = ShortUrlMapping {
                    version: INITIAL_VERSION,
                    ..mapping.clone()
                };
                slot.insert(written.clone());
                Ok(written)
            }
        }
    }

    async fn update_if_version(
        &self,
        mapping: &ShortUrlMapping,
    ) -> Result<Option<ShortUrlMapping>> {
        let Some(mut stored) = self.rows.get_mut(&mapping.short_url) else {
            return Ok(None);
        };

        if stored.version != mapping.version {
            return Ok(None);
        }

        let written = ShortUrlMapping {
            version: mapping.version + 1,
            ..mapping.clone()
        };
        *stored = written.clone();
        Ok(Some(written))
    }

    async fn delete_if_version(&self, mapping: &ShortUrlMapping) -> Result<bool> {
        Ok(self
            .rows
            .remove_if(&mapping.short_url, |_, stored| {
                stored.version == mapping.version
            })
            .is_some())
    }
}
