//! Runtime settings. Every flag falls back to an environment variable, and the binary
//! loads `.env` before parsing, so either style of configuration works.

use crate::api::{DEFAULT_COUNTRIES_URL, DEFAULT_EXCHANGE_RATES_URL};
use anyhow::{Result, anyhow};
use clap::Args;
use governor::Quota;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// Port the HTTP server listens on.
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// SQLite connection URL.
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://data/countries.db")]
    pub database_url: String,

    /// Country-info API endpoint (returns a JSON array of countries).
    #[arg(long, env = "COUNTRIES_API_URL", default_value = DEFAULT_COUNTRIES_URL)]
    pub countries_api_url: String,

    /// Exchange-rate API endpoint (returns `{result, rates}`).
    #[arg(long, env = "EXCHANGE_RATES_API_URL", default_value = DEFAULT_EXCHANGE_RATES_URL)]
    pub exchange_rates_api_url: String,

    /// Total timeout for each upstream request, in seconds.
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECS", default_value_t = 30)]
    pub upstream_timeout_secs: u64,

    /// Rate-limit window shared by both limiters, in milliseconds.
    #[arg(long, env = "RATE_LIMIT_WINDOW_MS", default_value_t = 900_000)]
    pub rate_limit_window_ms: u64,

    /// Requests each client may make per window, across all routes.
    #[arg(long, env = "RATE_LIMIT_MAX_REQUESTS", default_value_t = 100)]
    pub rate_limit_max_requests: u32,

    /// Refresh requests each client may make per window.
    #[arg(long, env = "REFRESH_RATE_LIMIT_MAX", default_value_t = 5)]
    pub refresh_rate_limit_max: u32,

    /// Directory holding the rendered summary image.
    #[arg(long, env = "CACHE_DIR", default_value = "cache")]
    pub cache_dir: PathBuf,

    /// TTF font used to draw the summary image, instead of the bundled DejaVu Sans.
    #[arg(long, env = "FONT_PATH")]
    pub font_path: Option<PathBuf>,

    /// Default log filter when RUST_LOG is unset.
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Settings {
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    /// Quota for the limiter applied to every route.
    pub fn general_quota(&self) -> Result<Quota> {
        window_quota(self.rate_limit_window_ms, self.rate_limit_max_requests)
    }

    /// Quota for the stricter refresh limiter.
    pub fn refresh_quota(&self) -> Result<Quota> {
        window_quota(self.rate_limit_window_ms, self.refresh_rate_limit_max)
    }
}

/// `max` requests per `window_ms`, available as a burst and replenished evenly.
pub fn window_quota(window_ms: u64, max: u32) -> Result<Quota> {
    let burst = NonZeroU32::new(max).ok_or_else(|| anyhow!("rate limit must be non-zero"))?;
    let period = Duration::from_millis(window_ms) / max;
    Quota::with_period(period)
        .map(|q| q.allow_burst(burst))
        .ok_or_else(|| anyhow!("rate-limit window must be non-zero"))
}
