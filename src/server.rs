//! Wiring: turn [`Settings`] into a store, a refresh pipeline, and a router.

use crate::api::Client;
use crate::config::Settings;
use crate::http::rate_limit::{ClientLimiter, prune_periodically};
use crate::http::{AppState, Limits, router};
use crate::refresh::Refresher;
use crate::storage::SqliteStore;
use crate::viz::SummaryRenderer;
use anyhow::{Context, Result};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Open the store and assemble the handler state.
pub async fn build_state(settings: &Settings) -> Result<AppState> {
    let store = SqliteStore::connect(&settings.database_url)
        .await
        .with_context(|| format!("open database {}", settings.database_url))?;
    let client = Client::new(
        settings.countries_api_url.clone(),
        settings.exchange_rates_api_url.clone(),
        settings.upstream_timeout(),
    )
    .context("build http client")?;
    let mut renderer = SummaryRenderer::new(&settings.cache_dir);
    if let Some(font) = &settings.font_path {
        renderer = renderer.with_font(font);
    }

    let store = Arc::new(store);
    let refresher = Refresher::new(Arc::new(client), store.clone(), renderer);
    Ok(AppState {
        store,
        refresher: Arc::new(refresher),
    })
}

/// How often idle clients are dropped from the rate limiters.
const LIMITER_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

pub fn build_limits(settings: &Settings) -> Result<Limits> {
    Ok(Limits {
        general: ClientLimiter::general(settings.general_quota()?),
        refresh: ClientLimiter::refresh(settings.refresh_quota()?),
    })
}

/// Serve until Ctrl-C.
pub async fn serve(settings: &Settings) -> Result<()> {
    let state = build_state(settings).await?;
    let limits = build_limits(settings)?;
    let pruner = tokio::spawn(prune_periodically(
        vec![limits.general.clone(), limits.refresh.clone()],
        LIMITER_PRUNE_INTERVAL,
    ));
    let app: Router = router(state, limits);
    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    log::info!("Server listening on port {}", settings.port);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;
    pruner.abort();
    log::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
