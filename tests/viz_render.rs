use country_gdp::models::TopCountry;
use country_gdp::viz::{RenderError, SummaryData, SummaryRenderer};
use std::fs;

fn sample_data() -> SummaryData {
    SummaryData {
        total_countries: 250,
        top_countries: vec![
            TopCountry {
                name: "United States".into(),
                estimated_gdp: 329_484_123_000.0,
            },
            TopCountry {
                name: "The United Kingdom of Great Britain and Northern Ireland".into(),
                estimated_gdp: 90_478_831_521.74,
            },
            TopCountry {
                name: "Germany".into(),
                estimated_gdp: 1_234_567.89,
            },
        ],
        last_refreshed: "2025-03-01 12:00:00 UTC".into(),
    }
}

fn is_png(bytes: &[u8]) -> bool {
    bytes.starts_with(b"\x89PNG\r\n\x1a\n")
}

#[test]
fn render_png_into_fresh_cache_dir() {
    let dir = tempfile::tempdir().unwrap();
    let renderer = SummaryRenderer::new(dir.path().join("cache").join("nested"));

    renderer.render(&sample_data()).unwrap();

    let path = renderer.image_path();
    assert!(path.ends_with("summary.png"));
    let bytes = fs::read(path).unwrap();
    assert!(is_png(&bytes));
    assert!(bytes.len() > 1000, "png unexpectedly small: {} bytes", bytes.len());
}

#[test]
fn render_overwrites_previous_image() {
    let dir = tempfile::tempdir().unwrap();
    let renderer = SummaryRenderer::new(dir.path());
    fs::write(renderer.image_path(), b"stale").unwrap();

    let empty = SummaryData {
        total_countries: 0,
        top_countries: Vec::new(),
        last_refreshed: "2025-03-01 12:00:00 UTC".into(),
    };
    renderer.render(&empty).unwrap();
    assert!(is_png(&fs::read(renderer.image_path()).unwrap()));
}

#[test]
fn missing_font_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let renderer = SummaryRenderer::new(dir.path().join("cache")).with_font(dir.path().join("nope.ttf"));

    let err = renderer.render(&sample_data()).unwrap_err();
    assert!(matches!(err, RenderError::Font { .. }), "{err}");
    assert!(!renderer.image_path().exists());
}

#[test]
fn override_font_is_used_when_present() {
    let dir = tempfile::tempdir().unwrap();
    let font = dir.path().join("copy.ttf");
    fs::copy(
        concat!(env!("CARGO_MANIFEST_DIR"), "/assets/DejaVuSans.ttf"),
        &font,
    )
    .unwrap();
    let renderer = SummaryRenderer::new(dir.path().join("cache")).with_font(&font);

    renderer.render(&sample_data()).unwrap();
    assert!(is_png(&fs::read(renderer.image_path()).unwrap()));
}
