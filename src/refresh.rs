//! The refresh pipeline: fetch both upstream datasets, merge them into country rows,
//! upsert those rows with bounded concurrency, stamp the run in metadata, and redraw
//! the summary image.

use crate::api::{CountrySource, UpstreamError};
use crate::gdp::estimate_gdp;
use crate::models::{
    CountryUpsert, RateTable, RawCountry, RefreshSummary, UPDATED_AT_KEY, to_iso_millis,
};
use crate::storage::{CountryStore, StorageError};
use crate::viz::util::display_timestamp;
use crate::viz::{RenderError, SummaryData, SummaryRenderer, TOP_N};
use chrono::{DateTime, SubsecRound, Utc};
use futures::stream::{self, StreamExt};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// Upper bound on in-flight country upserts.
pub const MAX_CONCURRENT_UPSERTS: usize = 10;

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("External data source unavailable: {0}")]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub struct Refresher {
    source: Arc<dyn CountrySource>,
    store: Arc<dyn CountryStore>,
    renderer: SummaryRenderer,
    rng: Mutex<Box<dyn RngCore + Send>>,
    // Only one run redraws the cached image at a time.
    render_lock: tokio::sync::Mutex<()>,
}

impl Refresher {
    /// A pipeline whose GDP multipliers come from an entropy-seeded generator.
    pub fn new(
        source: Arc<dyn CountrySource>,
        store: Arc<dyn CountryStore>,
        renderer: SummaryRenderer,
    ) -> Self {
        Self::with_rng(source, store, renderer, Box::new(StdRng::from_entropy()))
    }

    /// Same as [`Refresher::new`] with an explicit random source, for reproducible estimates.
    pub fn with_rng(
        source: Arc<dyn CountrySource>,
        store: Arc<dyn CountryStore>,
        renderer: SummaryRenderer,
        rng: Box<dyn RngCore + Send>,
    ) -> Self {
        Self {
            source,
            store,
            renderer,
            rng: Mutex::new(rng),
            render_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn renderer(&self) -> &SummaryRenderer {
        &self.renderer
    }

    /// Run one refresh.
    ///
    /// ### Errors
    /// - [`RefreshError::Upstream`] if either fetch fails; nothing is written in that case
    /// - [`RefreshError::Storage`] if the run timestamp can't be recorded
    ///
    /// Individual country upserts and image rendering never fail the run.
    pub async fn refresh(&self) -> Result<RefreshSummary, RefreshError> {
        let timestamp = Utc::now().trunc_subsecs(3);

        let (countries, rates) = tokio::try_join!(
            self.source.fetch_countries(),
            self.source.fetch_exchange_rates()
        )
        .inspect_err(|e| log::error!("refresh failed: {e}"))?;
        log::info!(
            "fetched {} countries and {} exchange rates",
            countries.len(),
            rates.len()
        );

        let records = self.build_records(&countries, &rates, timestamp);
        let processed = self.upsert_all(records).await;

        self.store
            .set_metadata(UPDATED_AT_KEY, &to_iso_millis(&timestamp))
            .await?;

        if let Err(e) = self.regenerate_image().await {
            log::error!("error generating summary image: {e}");
        }

        log::info!("refresh complete: {processed} of {} countries stored", countries.len());
        Ok(RefreshSummary {
            message: "Countries refreshed successfully".into(),
            countries_processed: processed,
            timestamp,
        })
    }

    /// Merge each raw country with its exchange rate and a fresh GDP estimate.
    fn build_records(
        &self,
        countries: &[RawCountry],
        rates: &RateTable,
        timestamp: DateTime<Utc>,
    ) -> Vec<CountryUpsert> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        countries
            .iter()
            .map(|raw| {
                let currency_code = raw.currency_code().map(str::to_owned);
                let exchange_rate = currency_code.as_deref().and_then(|c| rates.get(c).copied());
                let estimated_gdp = estimate_gdp(raw.population, exchange_rate, &mut **rng);
                CountryUpsert {
                    name: raw.name.clone(),
                    capital: raw.capital.clone(),
                    region: raw.region.clone(),
                    population: raw.population,
                    currency_code,
                    exchange_rate,
                    estimated_gdp,
                    flag_url: raw.flag.clone(),
                    last_refreshed_at: timestamp,
                }
            })
            .collect()
    }

    /// Upsert every record, at most [`MAX_CONCURRENT_UPSERTS`] at a time.
    /// Returns how many succeeded.
    async fn upsert_all(&self, records: Vec<CountryUpsert>) -> usize {
        let store = &self.store;
        stream::iter(records)
            .map(|record| async move {
                match store.upsert_country(&record).await {
                    Ok(()) => true,
                    Err(e) => {
                        log::warn!("Failed to process {}: {e}", record.name);
                        false
                    }
                }
            })
            .buffer_unordered(MAX_CONCURRENT_UPSERTS)
            .filter(|ok| futures::future::ready(*ok))
            .count()
            .await
    }

    /// Redraw the summary image from what is currently stored.
    pub async fn regenerate_image(&self) -> Result<(), RegenerateError> {
        let _guard = self.render_lock.lock().await;

        let total_countries = self.store.count().await?;
        let top_countries = self.store.top_by_gdp(TOP_N).await?;
        let last_refreshed = self
            .store
            .metadata(UPDATED_AT_KEY)
            .await?
            .and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        let data = SummaryData {
            total_countries,
            top_countries,
            last_refreshed: display_timestamp(&last_refreshed),
        };
        let renderer = self.renderer.clone();
        tokio::task::spawn_blocking(move || renderer.render(&data))
            .await
            .map_err(|e| RegenerateError::Join(e.to_string()))??;
        Ok(())
    }
}

/// Why the summary image could not be regenerated.
#[derive(Debug, Error)]
pub enum RegenerateError {
    #[error("could not read summary totals: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("render task failed: {0}")]
    Join(String),
}
