//! HTTP surface: routes, rate limiting, request logging, and error responses.
//! Every response allows any origin (CORS) and carries basic hardening headers.
//!
//! | Method | Path | |
//! |---|---|---|
//! | POST | `/countries/refresh` | run a refresh (strictly limited) |
//! | GET | `/countries` | list, filtered by `region`/`currency`, ordered by `sort` |
//! | GET | `/countries/image` | cached summary PNG |
//! | GET | `/countries/:name` | one country |
//! | DELETE | `/countries/:name` | remove one country |
//! | GET | `/status` | row count and last refresh time |
//! | GET | `/health` | liveness |

pub mod error;
pub mod handlers;
pub mod rate_limit;

use crate::refresh::Refresher;
use crate::storage::CountryStore;
use axum::Router;
use axum::extract::Request;
use axum::http::{HeaderValue, header};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use rate_limit::ClientLimiter;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;

pub use error::AppError;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CountryStore>,
    pub refresher: Arc<Refresher>,
}

/// The two limiters gating traffic.
#[derive(Clone)]
pub struct Limits {
    pub general: ClientLimiter,
    pub refresh: ClientLimiter,
}

/// Build the application router.
pub fn router(state: AppState, limits: Limits) -> Router {
    let refresh_route = post(handlers::refresh_countries)
        .layer(middleware::from_fn_with_state(limits.refresh, rate_limit::enforce));

    Router::new()
        .route("/countries/refresh", refresh_route)
        .route("/countries", get(handlers::list_countries))
        // Static segment wins over `:name`.
        .route("/countries/image", get(handlers::summary_image))
        .route(
            "/countries/:name",
            get(handlers::get_country).delete(handlers::delete_country),
        )
        .route("/status", get(handlers::status))
        .route("/health", get(handlers::health))
        .layer(middleware::from_fn_with_state(limits.general, rate_limit::enforce))
        .layer(CorsLayer::permissive())
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let started = Instant::now();
    let resp = next.run(req).await;
    log::info!(
        "{method} {path} {} {}ms",
        resp.status().as_u16(),
        started.elapsed().as_millis()
    );
    resp
}
