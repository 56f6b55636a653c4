#![allow(dead_code)]

use async_trait::async_trait;
use country_gdp::api::{COUNTRIES_API, CountrySource, EXCHANGE_RATES_API, UpstreamError};
use country_gdp::models::{
    Country, CountryQuery, CountryUpsert, Currency, RateTable, RawCountry, TopCountry,
};
use country_gdp::storage::{CountryStore, SqliteStore, StorageError};
use country_gdp::{Refresher, SummaryRenderer};
use rand::rngs::mock::StepRng;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub fn raw(name: &str, region: Option<&str>, population: u64, currency: Option<&str>) -> RawCountry {
    RawCountry {
        name: name.to_string(),
        capital: Some(format!("{name} City")),
        region: region.map(str::to_string),
        population,
        flag: Some(format!("https://flags.example/{}.svg", name.to_lowercase())),
        currencies: currency.map(|code| {
            vec![Currency {
                code: Some(code.to_string()),
                name: None,
                symbol: None,
            }]
        }),
    }
}

/// Seven countries covering the interesting merge cases: unmapped currency,
/// no currency at all, zero population, and a name with a space.
pub fn sample_countries() -> Vec<RawCountry> {
    vec![
        raw("Nigeria", Some("Africa"), 206_139_589, Some("NGN")),
        raw("Ghana", Some("Africa"), 31_072_940, Some("GHS")),
        raw("Germany", Some("Europe"), 83_240_525, Some("EUR")),
        raw("France", Some("Europe"), 67_391_582, Some("EUR")),
        raw("United States", Some("Americas"), 329_484_123, Some("USD")),
        raw("Narnia", None, 1_000_000, Some("XNA")),
        raw("Bouvet Island", Some("Antarctic"), 0, None),
    ]
}

pub fn sample_rates() -> RateTable {
    [("NGN", 1600.0), ("GHS", 15.0), ("EUR", 0.92), ("USD", 1.0)]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    None,
    CountriesTimeout,
    RatesRejected,
}

/// In-memory upstream.
pub struct FakeSource {
    pub countries: Vec<RawCountry>,
    pub rates: RateTable,
    pub failure: Failure,
}

impl FakeSource {
    pub fn sample() -> Self {
        Self {
            countries: sample_countries(),
            rates: sample_rates(),
            failure: Failure::None,
        }
    }

    pub fn failing(failure: Failure) -> Self {
        Self {
            failure,
            ..Self::sample()
        }
    }
}

#[async_trait]
impl CountrySource for FakeSource {
    async fn fetch_countries(&self) -> Result<Vec<RawCountry>, UpstreamError> {
        if self.failure == Failure::CountriesTimeout {
            return Err(UpstreamError::Timeout { api: COUNTRIES_API });
        }
        Ok(self.countries.clone())
    }

    async fn fetch_exchange_rates(&self) -> Result<RateTable, UpstreamError> {
        if self.failure == Failure::RatesRejected {
            return Err(UpstreamError::Rejected {
                api: EXCHANGE_RATES_API,
                detail: "result \"error\"".into(),
            });
        }
        Ok(self.rates.clone())
    }
}

/// Delegates to SQLite, but upserts of the listed names fail, and every upsert
/// records how many were in flight at once.
pub struct FlakyStore {
    pub inner: Arc<SqliteStore>,
    pub fail_names: HashSet<String>,
    pub upsert_delay: Duration,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: Arc<SqliteStore>, fail_names: &[&str]) -> Self {
        Self {
            inner,
            fail_names: fail_names.iter().map(|s| s.to_string()).collect(),
            upsert_delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CountryStore for FlakyStore {
    async fn upsert_country(&self, record: &CountryUpsert) -> Result<(), StorageError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.upsert_delay.is_zero() {
            tokio::time::sleep(self.upsert_delay).await;
        }
        let out = if self.fail_names.contains(&record.name) {
            Err(StorageError::Database(sqlx::Error::Protocol(
                "injected failure".into(),
            )))
        } else {
            self.inner.upsert_country(record).await
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        out
    }

    async fn list_countries(&self, query: &CountryQuery) -> Result<Vec<Country>, StorageError> {
        self.inner.list_countries(query).await
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Country>, StorageError> {
        self.inner.find_by_name(name).await
    }

    async fn delete_by_name(&self, name: &str) -> Result<Option<Country>, StorageError> {
        self.inner.delete_by_name(name).await
    }

    async fn count(&self) -> Result<i64, StorageError> {
        self.inner.count().await
    }

    async fn top_by_gdp(&self, limit: u32) -> Result<Vec<TopCountry>, StorageError> {
        self.inner.top_by_gdp(limit).await
    }

    async fn metadata(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.metadata(key).await
    }

    async fn set_metadata(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner.set_metadata(key, value).await
    }
}

pub async fn memory_store() -> Arc<SqliteStore> {
    Arc::new(SqliteStore::in_memory().await.unwrap())
}

/// A renderer pointed at a font that does not exist, so image generation fails
/// without touching the refresh result.
pub fn fontless_renderer(dir: &Path) -> SummaryRenderer {
    SummaryRenderer::new(dir.join("cache")).with_font(dir.join("missing.ttf"))
}

/// A renderer using the bundled font.
pub fn bundled_renderer(dir: &Path) -> SummaryRenderer {
    SummaryRenderer::new(dir.join("cache"))
}

/// Refresher with a multiplier pinned to 1000.
pub fn refresher(
    source: FakeSource,
    store: Arc<dyn CountryStore>,
    renderer: SummaryRenderer,
) -> Refresher {
    Refresher::with_rng(Arc::new(source), store, renderer, Box::new(StepRng::new(0, 0)))
}

pub fn by_name<'a>(rows: &'a [Country], name: &str) -> &'a Country {
    rows.iter()
        .find(|c| c.name == name)
        .unwrap_or_else(|| panic!("{name} missing"))
}
