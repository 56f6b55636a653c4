//! Estimated GDP: a synthetic figure derived from population and exchange rate.

use rand::Rng;
use std::ops::Range;

/// Range the per-country multiplier is drawn from.
pub const MULTIPLIER_RANGE: Range<f64> = 1000.0..2000.0;

/// Estimate GDP as `population * multiplier / exchange_rate`, rounded to 2 decimals.
///
/// `multiplier` is drawn uniformly from [`MULTIPLIER_RANGE`] using `rng`, so the
/// result is only reproducible when the caller pins the random source.
///
/// Returns `0.0` when the rate is missing, non-positive, or not finite.
///
/// ### Example
/// ```
/// use country_gdp::gdp::estimate_gdp;
/// use rand::rngs::mock::StepRng;
///
/// // A zero-valued source always yields the lower bound of the multiplier.
/// let mut rng = StepRng::new(0, 0);
/// assert_eq!(estimate_gdp(1_000_000, Some(2.0), &mut rng), 500_000_000.0);
/// assert_eq!(estimate_gdp(1_000_000, Some(0.0), &mut rng), 0.0);
/// ```
pub fn estimate_gdp<R: Rng + ?Sized>(population: u64, exchange_rate: Option<f64>, rng: &mut R) -> f64 {
    let rate = match exchange_rate {
        Some(r) if r.is_finite() && r > 0.0 => r,
        _ => return 0.0,
    };
    let multiplier = rng.gen_range(MULTIPLIER_RANGE);
    round2(population as f64 * multiplier / rate)
}

/// Round to two decimal places, half away from zero.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
