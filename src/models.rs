use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;

/// Metadata key holding the timestamp of the most recent refresh run.
pub const UPDATED_AT_KEY: &str = "updated_at";

/// Exchange rates keyed by ISO 4217 currency code (units per 1 USD).
pub type RateTable = HashMap<String, f64>;

/// One currency entry as reported by the country-info API.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Currency {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
}

/// Raw country entry from the country-info API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawCountry {
    pub name: String,
    #[serde(default)]
    pub capital: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub population: u64,
    #[serde(default)]
    pub flag: Option<String>,
    #[serde(default)]
    pub currencies: Option<Vec<Currency>>,
}

impl RawCountry {
    /// Code of the first listed currency, if the country has any.
    pub fn currency_code(&self) -> Option<&str> {
        self.currencies
            .as_ref()?
            .first()?
            .code
            .as_deref()
            .filter(|c| !c.trim().is_empty())
    }
}

/// Envelope returned by the exchange-rate API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRateResponse {
    pub result: String,
    #[serde(default)]
    pub rates: RateTable,
}

/// A persisted country row.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Country {
    pub id: i64,
    pub name: String,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub population: i64,
    pub currency_code: Option<String>,
    pub exchange_rate: Option<f64>,
    pub estimated_gdp: Option<f64>,
    pub flag_url: Option<String>,
    #[serde(serialize_with = "ser_iso_millis")]
    pub last_refreshed_at: DateTime<Utc>,
}

/// Values written by a single upsert; the row id is owned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryUpsert {
    pub name: String,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub population: u64,
    pub currency_code: Option<String>,
    pub exchange_rate: Option<f64>,
    pub estimated_gdp: f64,
    pub flag_url: Option<String>,
    pub last_refreshed_at: DateTime<Utc>,
}

/// Name and GDP of one entry in the summary ranking.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct TopCountry {
    pub name: String,
    pub estimated_gdp: f64,
}

/// Result of a successful refresh run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshSummary {
    pub message: String,
    pub countries_processed: usize,
    #[serde(serialize_with = "ser_iso_millis")]
    pub timestamp: DateTime<Utc>,
}

/// Body of `GET /status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub total_countries: i64,
    pub last_refreshed_at: Option<String>,
}

/// Ordering applied to country listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    NameAsc,
    GdpDesc,
    GdpAsc,
    PopulationDesc,
}

impl SortOrder {
    /// Parse a `sort` query value; anything unrecognized falls back to name order.
    pub fn parse(s: &str) -> Self {
        match s {
            "gdp_desc" => SortOrder::GdpDesc,
            "gdp_asc" => SortOrder::GdpAsc,
            "population_desc" => SortOrder::PopulationDesc,
            _ => SortOrder::NameAsc,
        }
    }
}

/// Query-string filters accepted by `GET /countries`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CountryQuery {
    pub region: Option<String>,
    pub currency: Option<String>,
    pub sort: Option<String>,
}

impl CountryQuery {
    /// Region filter, with empty values treated as absent.
    pub fn region(&self) -> Option<&str> {
        non_empty(self.region.as_deref())
    }

    /// Currency-code filter, with empty values treated as absent.
    pub fn currency(&self) -> Option<&str> {
        non_empty(self.currency.as_deref())
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort
            .as_deref()
            .map(SortOrder::parse)
            .unwrap_or_default()
    }
}

/// Accept `null` where a count is expected.
fn null_as_zero<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.unwrap_or(0))
}

fn non_empty(v: Option<&str>) -> Option<&str> {
    v.filter(|s| !s.is_empty())
}

/// Render a timestamp the way the API reports it: RFC 3339, millisecond precision, `Z` suffix.
pub fn to_iso_millis(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Serde helper for [`to_iso_millis`].
fn ser_iso_millis<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&to_iso_millis(ts))
}
