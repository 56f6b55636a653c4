//! Async clients for the two upstream services: the **country-info API** and the
//! **exchange-rate API**.
//!
//! Both are reached through the [`CountrySource`] trait so the refresh pipeline can be
//! driven by a fake in tests. [`Client`] is the HTTP implementation.
//!
//! ### Notes
//! - The country list is expected as a top-level JSON array of country objects. Entries
//!   that fail to decode are skipped one by one; the rest of the list is kept.
//! - The exchange-rate payload must carry `"result": "success"`; anything else is treated
//!   as an upstream failure.
//! - There is no retry. Timeouts come from the client builder (30s total by default).
//!
//! Typical usage:
//! ```no_run
//! # use country_gdp::api::{Client, CountrySource};
//! # async fn demo() -> Result<(), country_gdp::api::UpstreamError> {
//! let client = Client::default();
//! let countries = client.fetch_countries().await?;
//! let rates = client.fetch_exchange_rates().await?;
//! println!("{} countries, {} rates", countries.len(), rates.len());
//! # Ok(())
//! # }
//! ```
use crate::models::{ExchangeRateResponse, RateTable, RawCountry};
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use reqwest::redirect::Policy;
use std::time::Duration;
use thiserror::Error;

pub const COUNTRIES_API: &str = "Countries API";
pub const EXCHANGE_RATES_API: &str = "Exchange Rates API";

pub const DEFAULT_COUNTRIES_URL: &str =
    "https://restcountries.com/v2/all?fields=name,capital,region,population,flag,currencies";
pub const DEFAULT_EXCHANGE_RATES_URL: &str = "https://open.er-api.com/v6/latest/USD";

/// A failed fetch from one of the upstream services.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Could not fetch data from {api} (timeout)")]
    Timeout { api: &'static str },

    #[error("Could not fetch data from {api}: {source}")]
    Request {
        api: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{api} returned {detail}")]
    Rejected { api: &'static str, detail: String },

    #[error("Could not decode {api} response: {source}")]
    Decode {
        api: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl UpstreamError {
    /// Which upstream service failed.
    pub fn api(&self) -> &'static str {
        match self {
            UpstreamError::Timeout { api }
            | UpstreamError::Request { api, .. }
            | UpstreamError::Rejected { api, .. }
            | UpstreamError::Decode { api, .. } => *api,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, UpstreamError::Timeout { .. })
    }

    fn from_reqwest(api: &'static str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            UpstreamError::Timeout { api }
        } else if source.is_decode() {
            UpstreamError::Decode { api, source }
        } else {
            UpstreamError::Request { api, source }
        }
    }
}

/// Where the refresh pipeline gets its raw data from.
#[async_trait]
pub trait CountrySource: Send + Sync {
    /// Fetch the full country list.
    async fn fetch_countries(&self) -> Result<Vec<RawCountry>, UpstreamError>;

    /// Fetch the exchange-rate table keyed by currency code.
    async fn fetch_exchange_rates(&self) -> Result<RateTable, UpstreamError>;
}

#[derive(Debug, Clone)]
pub struct Client {
    pub countries_url: String,
    pub exchange_rates_url: String,
    http: HttpClient,
}

impl Default for Client {
    fn default() -> Self {
        Self::new(DEFAULT_COUNTRIES_URL, DEFAULT_EXCHANGE_RATES_URL, Duration::from_secs(30))
            .expect("reqwest client build")
    }
}

impl Client {
    /// Build a client for the given upstream URLs with a total request timeout.
    ///
    /// ### Errors
    /// Fails only if the TLS backend cannot be initialised.
    pub fn new(
        countries_url: impl Into<String>,
        exchange_rates_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = HttpClient::builder()
            .timeout(timeout) // total request timeout
            .connect_timeout(Duration::from_secs(10))
            .redirect(Policy::limited(5))
            .user_agent(concat!("country-gdp/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            countries_url: countries_url.into(),
            exchange_rates_url: exchange_rates_url.into(),
            http,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        api: &'static str,
        url: &str,
    ) -> Result<T, UpstreamError> {
        log::debug!("GET {url}");
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest(api, e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(UpstreamError::Rejected {
                api,
                detail: format!("HTTP {status}"),
            });
        }
        resp.json::<T>()
            .await
            .map_err(|e| UpstreamError::from_reqwest(api, e))
    }
}

#[async_trait]
impl CountrySource for Client {
    async fn fetch_countries(&self) -> Result<Vec<RawCountry>, UpstreamError> {
        let items: Vec<serde_json::Value> =
            self.get_json(COUNTRIES_API, &self.countries_url).await?;
        Ok(countries_from_values(items))
    }

    async fn fetch_exchange_rates(&self) -> Result<RateTable, UpstreamError> {
        let body: ExchangeRateResponse = self
            .get_json(EXCHANGE_RATES_API, &self.exchange_rates_url)
            .await?;
        rates_from_response(body)
    }
}

/// Decode each country on its own; entries that don't fit [`RawCountry`] are logged
/// and dropped so one bad record can't sink the whole list.
pub fn countries_from_values(items: Vec<serde_json::Value>) -> Vec<RawCountry> {
    let total = items.len();
    let countries: Vec<RawCountry> = items
        .into_iter()
        .enumerate()
        .filter_map(|(idx, item)| match serde_json::from_value::<RawCountry>(item) {
            Ok(country) => Some(country),
            Err(e) => {
                log::warn!("skipping country entry {idx}: {e}");
                None
            }
        })
        .collect();
    if countries.len() < total {
        log::warn!("{} of {total} country entries were unreadable", total - countries.len());
    }
    countries
}

/// Unwrap the rate table, rejecting envelopes whose `result` is not `"success"`.
pub fn rates_from_response(body: ExchangeRateResponse) -> Result<RateTable, UpstreamError> {
    if body.result != "success" {
        return Err(UpstreamError::Rejected {
            api: EXCHANGE_RATES_API,
            detail: format!("result \"{}\"", body.result),
        });
    }
    Ok(body.rates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn non_success_result_is_rejected() {
        let body = ExchangeRateResponse {
            result: "error".into(),
            rates: HashMap::new(),
        };
        let err = rates_from_response(body).unwrap_err();
        assert_eq!(err.api(), EXCHANGE_RATES_API);
        assert!(!err.is_timeout());
        assert!(err.to_string().contains("error"));
    }

    #[test]
    fn timeout_message_names_the_api() {
        let err = UpstreamError::Timeout { api: COUNTRIES_API };
        assert!(err.is_timeout());
        assert_eq!(
            err.to_string(),
            "Could not fetch data from Countries API (timeout)"
        );
    }
}
