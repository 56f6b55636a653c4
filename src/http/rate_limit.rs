//! Per-client request limiting on top of `governor`'s keyed GCRA limiter.

use axum::Json;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use governor::clock::{Clock, DefaultClock};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use serde_json::json;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

/// A keyed limiter plus the message sent when a client exceeds it.
#[derive(Clone)]
pub struct ClientLimiter {
    limiter: Arc<DefaultKeyedRateLimiter<IpAddr>>,
    message: &'static str,
}

impl ClientLimiter {
    pub fn new(quota: Quota, message: &'static str) -> Self {
        Self {
            limiter: Arc::new(RateLimiter::keyed(quota)),
            message,
        }
    }

    /// Limiter applied to every route.
    pub fn general(quota: Quota) -> Self {
        Self::new(quota, "Too many requests, please try again later")
    }

    /// Stricter limiter for the refresh route.
    pub fn refresh(quota: Quota) -> Self {
        Self::new(
            quota,
            "Refresh limit exceeded. Please wait before refreshing again.",
        )
    }

    /// Forget clients whose quota has fully replenished.
    pub fn prune(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }
}

/// Prune every limiter once per `every`, forever.
pub async fn prune_periodically(limiters: Vec<ClientLimiter>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        for limiter in &limiters {
            limiter.prune();
        }
        log::debug!(
            "rate limiter state: {} clients tracked",
            limiters.iter().map(ClientLimiter::tracked_clients).sum::<usize>()
        );
    }
}

/// Requests without a known peer address (e.g. in-process calls) share one bucket.
fn client_ip(req: &Request) -> IpAddr {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Middleware: reject with 429 and `Retry-After` once the client's quota is spent.
pub async fn enforce(State(limiter): State<ClientLimiter>, req: Request, next: Next) -> Response {
    let ip = client_ip(&req);
    match limiter.limiter.check_key(&ip) {
        Ok(()) => next.run(req).await,
        Err(not_until) => {
            let wait = not_until.wait_time_from(DefaultClock::default().now());
            log::warn!("rate limit hit for {ip}, retry in {}s", wait.as_secs());
            let mut resp = (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({ "error": limiter.message })),
            )
                .into_response();
            let secs = wait.as_secs().max(1);
            if let Ok(v) = HeaderValue::from_str(&secs.to_string()) {
                resp.headers_mut().insert(header::RETRY_AFTER, v);
            }
            resp
        }
    }
}
