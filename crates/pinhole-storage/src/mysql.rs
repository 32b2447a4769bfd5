use async_trait::async_trait;
use pinhole_core::reservation::INITIAL_VERSION;
use pinhole_core::store::Result;
use pinhole_core::{
    MappingReader, MappingStore, ReservationStore, ShortUrl, ShortUrlMapping, ShortUrlReservation,
    StorageError,
};
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, MySqlPool, QueryBuilder, Row};
use tracing::{debug, trace};

const RESERVATIONS_DDL: &str = include_str!("../ddl/mysql/short_url_reservations.sql");
const MAPPINGS_DDL: &str = include_str!("../ddl/mysql/short_url_mappings.sql");

/// Rows per multi-row `INSERT` when populating the reservation table.
const POPULATE_CHUNK: u64 = 1_000;

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

fn short_url_column(row: &MySqlRow, column: &str) -> Result<ShortUrl> {
    let raw: String = row.try_get(column).map_err(map_sqlx_error)?;
    ShortUrl::new(raw).map_err(|e| StorageError::InvalidData(e.to_string()))
}

async fn connect_pool(database_url: &str) -> Result<MySqlPool> {
    MySqlPool::connect(database_url)
        .await
        .map_err(map_sqlx_error)
}

/// MySQL implementation of the reservation table.
///
/// The availability index is a secondary index on the nullable
/// `is_available` column, so only available rows appear in it.
#[derive(Debug, Clone)]
pub struct MySqlReservationStore {
    pool: MySqlPool,
}

impl MySqlReservationStore {
    /// Creates a store from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates a store by opening a new MySQL connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        Ok(Self::new(connect_pool(database_url).await?))
    }

    fn decode_row(row: &MySqlRow) -> Result<ShortUrlReservation> {
        let short_url = short_url_column(row, "short_url")?;
        let is_available: Option<String> = row.try_get("is_available").map_err(map_sqlx_error)?;
        let is_available = is_available
            .map(ShortUrl::new)
            .transpose()
            .map_err(|e| StorageError::InvalidData(e.to_string()))?;
        let version: u64 = row.try_get("version").map_err(map_sqlx_error)?;

        Ok(ShortUrlReservation {
            short_url,
            is_available,
            version,
        })
    }

    async fn populate(&self, min: u64, max: u64) -> Result<()> {
        let mut start = min;
        loop {
            let end = start.saturating_add(POPULATE_CHUNK - 1).min(max);

            let mut builder = QueryBuilder::<MySql>::new(
                "INSERT INTO short_url_reservations (short_url, is_available, version) ",
            );
            builder.push_values(start..=end, |mut values, value| {
                let code = ShortUrl::encode(value);
                values
                    .push_bind(code.as_str().to_owned())
                    .push_bind(code.as_str().to_owned())
                    .push_bind(INITIAL_VERSION);
            });
            builder
                .build()
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

            trace!(start, end, "populated reservation chunk");

            match end.checked_add(1) {
                Some(next) if next <= max => start = next,
                _ => return Ok(()),
            }
        }
    }
}

#[async_trait]
impl ReservationStore for MySqlReservationStore {
    async fn recreate(&self, min: u64, max: u64) -> Result<()> {
        if min > max {
            return Err(StorageError::Operation(format!(
                "empty range [{min}, {max}]"
            )));
        }

        sqlx::query("DROP TABLE IF EXISTS short_url_reservations")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        sqlx::query(RESERVATIONS_DDL)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        self.populate(min, max).await?;

        debug!(min, max, "recreated mysql reservation table");
        Ok(())
    }

    async fn get(&self, short_url: &ShortUrl) -> Result<Option<ShortUrlReservation>> {
        let row = sqlx::query(
            r#"
            SELECT short_url, is_available, version
            FROM short_url_reservations
            WHERE short_url = ?
            "#,
        )
        .bind(short_url.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(Self::decode_row).transpose()
    }

    async fn scan(&self) -> Result<Vec<ShortUrlReservation>> {
        let rows = sqlx::query("SELECT short_url, is_available, version FROM short_url_reservations")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.iter().map(Self::decode_row).collect()
    }

    async fn scan_available(&self, limit: usize) -> Result<Vec<ShortUrl>> {
        let rows = sqlx::query(
            r#"
            SELECT is_available
            FROM short_url_reservations
            WHERE is_available IS NOT NULL
            LIMIT ?
            "#,
        )
        .bind(limit as u64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter()
            .map(|row| short_url_column(row, "is_available"))
            .collect()
    }

    async fn update_if_version(
        &self,
        row: &ShortUrlReservation,
    ) -> Result<Option<ShortUrlReservation>> {
        let result = sqlx::query(
            r#"
            UPDATE short_url_reservations
            SET is_available = ?, version = version + 1
            WHERE short_url = ?
              AND version = ?
            "#,
        )
        .bind(row.is_available.as_ref().map(ShortUrl::as_str))
        .bind(row.short_url.as_str())
        .bind(row.version)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        Ok(Some(ShortUrlReservation {
            version: row.version + 1,
            ..row.clone()
        }))
    }
}

/// MySQL implementation of the mapping table.
#[derive(Debug, Clone)]
pub struct MySqlMappingStore {
    pool: MySqlPool,
}

impl MySqlMappingStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        Ok(Self::new(connect_pool(database_url).await?))
    }

    fn decode_row(row: &MySqlRow) -> Result<ShortUrlMapping> {
        Ok(ShortUrlMapping {
            short_url: short_url_column(row, "short_url")?,
            long_url: row.try_get("long_url").map_err(map_sqlx_error)?,
            version: row.try_get("version").map_err(map_sqlx_error)?,
        })
    }
}

#[async_trait]
impl MappingReader for MySqlMappingStore {
    async fn get(&self, short_url: &ShortUrl) -> Result<Option<ShortUrlMapping>> {
        let row = sqlx::query(
            r#"
            SELECT short_url, long_url, version
            FROM short_url_mappings
            WHERE short_url = ?
            "#,
        )
        .bind(short_url.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(Self::decode_row).transpose()
    }

    async fn find_by_long_url(&self, long_url: &str) -> Result<Vec<ShortUrlMapping>> {
        let rows = sqlx::query(
            r#"
            SELECT short_url, long_url, version
            FROM short_url_mappings
            WHERE long_url = ?
            "#,
        )
        .bind(long_url)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let mut found = rows
            .iter()
            .map(Self::decode_row)
            .collect::<Result<Vec<_>>>()?;
        found.sort_by_key(|row| row.short_url.decode());
        Ok(found)
    }

    async fn scan(&self) -> Result<Vec<ShortUrlMapping>> {
        let rows = sqlx::query("SELECT short_url, long_url, version FROM short_url_mappings")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.iter().map(Self::decode_row).collect()
    }
}

#[async_trait]
impl MappingStore for MySqlMappingStore {
    async fn recreate(&self) -> Result<()> {
        sqlx::query("DROP TABLE IF EXISTS short_url_mappings")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        sqlx::query(MAPPINGS_DDL)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        debug!("recreated mysql mapping table");
        Ok(())
    }

    async fn insert(&self, mapping: &ShortUrlMapping) -> Result<ShortUrlMapping> {
        let result = sqlx::query(
            r#"
            INSERT INTO short_url_mappings (short_url, long_url, version)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(mapping.short_url.as_str())
        .bind(mapping.long_url.as_str())
        .bind(INITIAL_VERSION)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(ShortUrlMapping {
                version: INITIAL_VERSION,
                ..mapping.clone()
            }),
            Err(err) if is_unique_violation(&err) => {
                Err(StorageError::Conflict(mapping.short_url.to_string()))
            }
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn update_if_version(
        &self,
        mapping: &ShortUrlMapping,
    ) -> Result<Option<ShortUrlMapping>> {
        let result = sqlx::query(
            r#"
            UPDATE short_url_mappings
            SET long_url = ?, version = version + 1
            WHERE short_url = ?
              AND version = ?
            "#,
        )
        .bind(mapping.long_url.as_str())
        .bind(mapping.short_url.as_str())
        .bind(mapping.version)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        Ok(Some(ShortUrlMapping {
            version: mapping.version + 1,
            ..mapping.clone()
        }))
    }

    async fn delete_if_version(&self, mapping: &ShortUrlMapping) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM short_url_mappings
            WHERE short_url = ?
              AND version = ?
            "#,
        )
        .bind(mapping.short_url.as_str())
        .bind(mapping.version)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}
