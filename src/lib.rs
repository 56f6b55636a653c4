//! country_gdp
//!
//! A small REST service that refreshes a table of countries from a country-info API and
//! an exchange-rate API, stores the merged rows, and serves them with filtering,
//! sorting, and a rendered summary image. Pairs with the `country-gdp` binary.
//!
//! ### Features
//! - Concurrent fetch of both upstream datasets, bounded-concurrency upserts
//! - Synthetic GDP estimate from population and exchange rate, with an injectable random source
//! - SQLite persistence through `sqlx`
//! - PNG summary (top countries by GDP) drawn with Plotters
//! - Per-client rate limiting on the HTTP surface
//!
//! ### Example
//! ```no_run
//! use std::sync::Arc;
//! use country_gdp::{Client, Refresher, SqliteStore, SummaryRenderer};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let store = Arc::new(SqliteStore::connect("sqlite://data/countries.db").await?);
//! let renderer = SummaryRenderer::new("cache");
//! let refresher = Refresher::new(Arc::new(Client::default()), store, renderer);
//! let summary = refresher.refresh().await?;
//! println!("{} countries stored", summary.countries_processed);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod gdp;
pub mod http;
pub mod models;
pub mod refresh;
pub mod server;
pub mod storage;
pub mod viz;

pub use api::{Client, CountrySource};
pub use models::{Country, CountryQuery, SortOrder};
pub use refresh::Refresher;
pub use storage::{CountryStore, SqliteStore};
pub use viz::SummaryRenderer;
