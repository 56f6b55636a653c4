//! Persistence for country rows and refresh metadata.
//!
//! [`CountryStore`] is the seam between the service and its relational store. The
//! refresh pipeline is the only writer of country rows; handlers only read, apart from
//! deletion by name. [`SqliteStore`] is the `sqlx`-backed implementation, with the schema
//! created by the embedded migrations in `migrations/`.
//!
//! All name, region, and currency matching is exact and case-sensitive.

use crate::models::{Country, CountryQuery, CountryUpsert, SortOrder, TopCountry};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::str::FromStr;
use thiserror::Error;

const COUNTRY_COLUMNS: &str = "id, name, capital, region, population, currency_code, \
     exchange_rate, estimated_gdp, flag_url, last_refreshed_at";

/// Errors produced by [`CountryStore`] operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("population {0} does not fit the store")]
    PopulationOverflow(u64),
}

/// Read and write primitives the service needs from its store.
#[async_trait]
pub trait CountryStore: Send + Sync {
    /// Insert or update the row whose name equals `record.name`.
    async fn upsert_country(&self, record: &CountryUpsert) -> Result<(), StorageError>;

    /// List rows matching the query's filters, in the query's sort order.
    async fn list_countries(&self, query: &CountryQuery) -> Result<Vec<Country>, StorageError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<Country>, StorageError>;

    /// Remove the row with this exact name, returning it if it existed.
    async fn delete_by_name(&self, name: &str) -> Result<Option<Country>, StorageError>;

    async fn count(&self) -> Result<i64, StorageError>;

    /// Rows with a known GDP, highest first.
    async fn top_by_gdp(&self, limit: u32) -> Result<Vec<TopCountry>, StorageError>;

    async fn metadata(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set_metadata(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// `SQLite`-backed store.
///
/// Create with [`SqliteStore::connect`] for file-backed persistence
/// or [`SqliteStore::in_memory`] for tests.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `url` and apply migrations.
    ///
    /// ### Errors
    /// Returns [`StorageError::Io`] if the parent directory can't be created, or a
    /// database/migration error if the store can't be opened.
    pub async fn connect(url: &str) -> Result<Self, StorageError> {
        let opts = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        if let Some(parent) = opts.get_filename().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await?;
        Self::from_pool(pool).await
    }

    /// A private in-memory database. The pool is pinned to one connection that never
    /// expires, since each `SQLite` memory connection is its own database.
    pub async fn in_memory() -> Result<Self, StorageError> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await?;
        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, applying pending migrations.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StorageError> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn order_by_clause(sort: SortOrder) -> &'static str {
    match sort {
        SortOrder::NameAsc => " ORDER BY name ASC",
        SortOrder::GdpDesc => " ORDER BY estimated_gdp IS NULL, estimated_gdp DESC, name ASC",
        SortOrder::GdpAsc => " ORDER BY estimated_gdp IS NULL, estimated_gdp ASC, name ASC",
        SortOrder::PopulationDesc => " ORDER BY population DESC, name ASC",
    }
}

#[async_trait]
impl CountryStore for SqliteStore {
    async fn upsert_country(&self, record: &CountryUpsert) -> Result<(), StorageError> {
        let population = i64::try_from(record.population)
            .map_err(|_| StorageError::PopulationOverflow(record.population))?;
        sqlx::query(
            r"
            INSERT INTO countries (
                name, capital, region, population, currency_code,
                exchange_rate, estimated_gdp, flag_url, last_refreshed_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT (name) DO UPDATE SET
                capital = excluded.capital,
                region = excluded.region,
                population = excluded.population,
                currency_code = excluded.currency_code,
                exchange_rate = excluded.exchange_rate,
                estimated_gdp = excluded.estimated_gdp,
                flag_url = excluded.flag_url,
                last_refreshed_at = excluded.last_refreshed_at
            ",
        )
        .bind(&record.name)
        .bind(&record.capital)
        .bind(&record.region)
        .bind(population)
        .bind(&record.currency_code)
        .bind(record.exchange_rate)
        .bind(record.estimated_gdp)
        .bind(&record.flag_url)
        .bind(record.last_refreshed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_countries(&self, query: &CountryQuery) -> Result<Vec<Country>, StorageError> {
        let mut qb: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {COUNTRY_COLUMNS} FROM countries WHERE 1 = 1"));
        if let Some(region) = query.region() {
            qb.push(" AND region = ").push_bind(region.to_owned());
        }
        if let Some(currency) = query.currency() {
            qb.push(" AND currency_code = ").push_bind(currency.to_owned());
        }
        qb.push(order_by_clause(query.sort_order()));

        let rows = qb.build_query_as::<Country>().fetch_all(&self.pool).await?;
        log::debug!("countries fetched: {}", rows.len());
        Ok(rows)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Country>, StorageError> {
        let row = sqlx::query_as::<_, Country>(&format!(
            "SELECT {COUNTRY_COLUMNS} FROM countries WHERE name = ?1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_by_name(&self, name: &str) -> Result<Option<Country>, StorageError> {
        let row = sqlx::query_as::<_, Country>(&format!(
            "DELETE FROM countries WHERE name = ?1 RETURNING {COUNTRY_COLUMNS}"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn count(&self) -> Result<i64, StorageError> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM countries")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    async fn top_by_gdp(&self, limit: u32) -> Result<Vec<TopCountry>, StorageError> {
        let rows = sqlx::query_as::<_, TopCountry>(
            r"
            SELECT name, estimated_gdp
            FROM countries
            WHERE estimated_gdp IS NOT NULL
            ORDER BY estimated_gdp DESC, name ASC
            LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn metadata(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM metadata WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    async fn set_metadata(&self, key: &str, value: &str) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO metadata (key, value) VALUES (?1, ?2)
            ON CONFLICT (key) DO UPDATE SET value = excluded.value
            ",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
