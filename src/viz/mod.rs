//! Summary image rendering: a fixed-layout **PNG** with the country count,
//! the top countries by estimated GDP, and the time of the last refresh.
//!
//! - 800×1000 white canvas, black text
//! - GDP values as `$1,234,567.89`
//! - Long names are truncated to their column
//! - DejaVu Sans is bundled (no OS font discovery); a TTF override can be configured

pub mod text;
pub mod util;

use crate::models::TopCountry;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters_bitmap::BitMapBackend;
use std::path::{Path, PathBuf};
use thiserror::Error;

use text::truncate_to_width;
use util::{ensure_font_registered, format_usd};

pub const WIDTH: u32 = 800;
pub const HEIGHT: u32 = 1000;

/// How many countries the ranking shows.
pub const TOP_N: u32 = 5;

/// File name of the rendered image inside the cache directory.
pub const IMAGE_FILE_NAME: &str = "summary.png";

const LIST_FONT_PX: u32 = 22;
const NAME_X: i32 = 80;
const GDP_X: i32 = 550;
const LIST_TOP_Y: i32 = 290;
const LIST_STEP_Y: i32 = 40;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("font unavailable at {}: {reason}", path.display())]
    Font { path: PathBuf, reason: String },

    #[error("drawing failed: {0}")]
    Draw(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything the image shows.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryData {
    pub total_countries: i64,
    pub top_countries: Vec<TopCountry>,
    /// Already formatted for display.
    pub last_refreshed: String,
}

/// Draws [`SummaryData`] to a fixed path, overwriting what was there.
#[derive(Debug, Clone)]
pub struct SummaryRenderer {
    image_path: PathBuf,
    font_path: Option<PathBuf>,
}

impl SummaryRenderer {
    /// Renderer writing `<cache_dir>/summary.png` with the bundled font.
    pub fn new(cache_dir: impl AsRef<Path>) -> Self {
        Self {
            image_path: cache_dir.as_ref().join(IMAGE_FILE_NAME),
            font_path: None,
        }
    }

    /// Draw with the TTF at `font_path` instead of the bundled font.
    #[must_use]
    pub fn with_font(mut self, font_path: impl Into<PathBuf>) -> Self {
        self.font_path = Some(font_path.into());
        self
    }

    pub fn image_path(&self) -> &Path {
        &self.image_path
    }

    /// Render the summary PNG.
    ///
    /// ### Errors
    /// - [`RenderError::Font`] if an override font can't be read or parsed
    /// - [`RenderError::Io`] if the cache directory can't be created
    /// - [`RenderError::Draw`] for any backend failure, including writing the file
    pub fn render(&self, data: &SummaryData) -> Result<(), RenderError> {
        ensure_font_registered(self.font_path.as_deref())?;
        if let Some(dir) = self.image_path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir)?;
        }

        let root = BitMapBackend::new(&self.image_path, (WIDTH, HEIGHT)).into_drawing_area();
        draw_summary(&root, data)?;
        root.present().map_err(draw_err)?;
        log::info!("summary image written to {}", self.image_path.display());
        Ok(())
    }
}

fn draw_err<E: std::fmt::Debug>(e: E) -> RenderError {
    RenderError::Draw(format!("{e:?}"))
}

fn centered(px: u32) -> TextStyle<'static> {
    TextStyle::from((FontFamily::SansSerif, px)).pos(Pos::new(HPos::Center, VPos::Center))
}

fn left(px: u32) -> TextStyle<'static> {
    TextStyle::from((FontFamily::SansSerif, px)).pos(Pos::new(HPos::Left, VPos::Center))
}

fn draw_summary<DB>(root: &DrawingArea<DB, plotters::coord::Shift>, data: &SummaryData) -> Result<(), RenderError>
where
    DB: DrawingBackend,
{
    let mid_x = (WIDTH / 2) as i32;
    root.fill(&WHITE).map_err(draw_err)?;

    root.draw(&Text::new("Country Data Summary", (mid_x, 100), centered(40)))
        .map_err(draw_err)?;
    root.draw(&Text::new(
        format!("Total Countries: {}", data.total_countries),
        (mid_x, 160),
        centered(28),
    ))
    .map_err(draw_err)?;
    root.draw(&Text::new(
        format!("Top {TOP_N} Countries by Estimated GDP"),
        (mid_x, 240),
        centered(30),
    ))
    .map_err(draw_err)?;

    // Name column runs up to the GDP column with a small gap.
    let name_max_px = (GDP_X - NAME_X - 20) as u32;
    let mut y = LIST_TOP_Y;
    for (idx, country) in data.top_countries.iter().take(TOP_N as usize).enumerate() {
        let label = truncate_to_width(
            &format!("{}. {}", idx + 1, country.name),
            LIST_FONT_PX,
            name_max_px,
        );
        root.draw(&Text::new(label, (NAME_X, y), left(LIST_FONT_PX)))
            .map_err(draw_err)?;
        root.draw(&Text::new(
            format_usd(country.estimated_gdp),
            (GDP_X, y),
            left(LIST_FONT_PX),
        ))
        .map_err(draw_err)?;
        y += LIST_STEP_Y;
    }

    root.draw(&Text::new(
        format!("Last updated: {}", data.last_refreshed),
        (mid_x, HEIGHT as i32 - 60),
        centered(18),
    ))
    .map_err(draw_err)?;
    Ok(())
}
