//! Utility functions for the summary image: money formatting, timestamps, font loading.

use chrono::{DateTime, Utc};
use num_format::{Locale, ToFormattedString};
use plotters::style::{FontFamily, FontStyle};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use super::RenderError;

/// Format an amount as US dollars with thousands separators and two decimals,
/// e.g. `1234567.891` → `$1,234,567.89`.
pub fn format_usd(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!(
        "{sign}${}.{:02}",
        (cents / 100).to_formatted_string(&Locale::en),
        cents % 100
    )
}

/// Timestamp as shown on the image, e.g. `2025-01-02 03:04:05 UTC`.
pub fn display_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Bundled fallback font; `ab_glyph` doesn't discover OS fonts.
static EMBEDDED_FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

#[derive(Debug, Clone, PartialEq, Eq)]
enum FontSource {
    Embedded,
    File(PathBuf),
}

/// Which font is registered as sans-serif, plus every font file loaded so far.
struct FontRegistry {
    active: Option<FontSource>,
    // Plotters keeps registered bytes for the life of the process, so each file is
    // read and leaked at most once.
    files: BTreeMap<PathBuf, &'static [u8]>,
}

static FONTS: Mutex<FontRegistry> = Mutex::new(FontRegistry {
    active: None,
    files: BTreeMap::new(),
});

/// Register the "sans-serif" family used by every text draw.
///
/// With no override the bundled DejaVu Sans is used. An override path is read on first
/// use; switching back and forth between fonts never reloads a file.
pub fn ensure_font_registered(override_path: Option<&Path>) -> Result<(), RenderError> {
    let mut fonts = FONTS.lock().unwrap_or_else(PoisonError::into_inner);
    let wanted = override_path.map_or(FontSource::Embedded, |p| FontSource::File(p.to_path_buf()));
    if fonts.active.as_ref() == Some(&wanted) {
        return Ok(());
    }

    let bytes: &'static [u8] = match &wanted {
        FontSource::Embedded => EMBEDDED_FONT,
        FontSource::File(path) => {
            if let Some(bytes) = fonts.files.get(path).copied() {
                bytes
            } else {
                let data = std::fs::read(path).map_err(|e| RenderError::Font {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
                let leaked: &'static [u8] = Box::leak(data.into_boxed_slice());
                fonts.files.insert(path.clone(), leaked);
                leaked
            }
        }
    };

    plotters::style::register_font(FontFamily::SansSerif.as_str(), FontStyle::Normal, bytes)
        .map_err(|_| RenderError::Font {
            path: match &wanted {
                FontSource::Embedded => PathBuf::from("<embedded>"),
                FontSource::File(p) => p.clone(),
            },
            reason: "invalid font data".into(),
        })?;

    fonts.active = Some(wanted);
    Ok(())
}
