//! # Rate Limiting by Client Address
//!
//! Fixed-window request counter keyed by client IP address. Throttles
//! password and license-key guessing against `/verify` as well as admin-token
//! guessing.
//!
//! The key is the peer IP of the accepted TCP connection, read from
//! [`ConnectInfo<SocketAddr>`] (the server is started with
//! `into_make_service_with_connect_info`). The port is ignored, so a client
//! opening new connections keeps its budget. `X-Forwarded-For` is set by the
//! client and is only consulted when [`RateLimitConfig::trust_forwarded_for`]
//! is enabled for deployments behind a proxy that overwrites it; its first
//! hop then replaces the peer address. Requests with neither share the
//! `"unknown"` bucket.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use parking_lot::Mutex;

use crate::error::{ErrorBody, ErrorDetail};

/// Rate limiter configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum requests per window. `0` disables limiting.
    pub max_requests: u64,
    /// Window length.
    pub window: Duration,
    /// Key on the first `X-Forwarded-For` hop instead of the peer address.
    pub trust_forwarded_for: bool,
}

impl RateLimitConfig {
    pub fn per_minute(max_requests: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(60),
            trust_forwarded_for: false,
        }
    }

    /// Same budget, keyed on the proxy-supplied client address.
    pub fn behind_proxy(self) -> Self {
        Self {
            trust_forwarded_for: true,
            ..self
        }
    }
}

#[derive(Debug, Clone)]
struct Window {
    count: u64,
    started: Instant,
}

#[derive(Debug)]
struct Windows {
    by_client: HashMap<String, Window>,
    last_pruned: Instant,
}

/// Shared rate limiter state.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Arc<Mutex<Windows>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Arc::new(Mutex::new(Windows {
                by_client: HashMap::new(),
                last_pruned: Instant::now(),
            })),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Count a request from `key`; `false` when it exceeds the budget.
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> bool {
        if self.config.max_requests == 0 {
            return true;
        }

        let span = self.config.window;
        let mut windows = self.windows.lock();

        // Expired windows are dropped at most once per window length.
        if now.duration_since(windows.last_pruned) >= span {
            windows
                .by_client
                .retain(|_, w| now.duration_since(w.started) < span);
            windows.last_pruned = now;
        }

        let window = windows
            .by_client
            .entry(key.to_string())
            .or_insert(Window {
                count: 0,
                started: now,
            });

        if now.duration_since(window.started) >= span {
            window.count = 0;
            window.started = now;
        }

        if window.count >= self.config.max_requests {
            false
        } else {
            window.count += 1;
            true
        }
    }

    fn tracked_clients(&self) -> usize {
        self.windows.lock().by_client.len()
    }
}

/// Client key for a request under `config`.
fn client_key(request: &Request, config: &RateLimitConfig) -> String {
    if config.trust_forwarded_for {
        let forwarded = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(hop) = forwarded {
            return hop.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware that enforces per-address rate limits.
///
/// Expects a [`RateLimiter`] request extension; requests pass through
/// unthrottled when none is installed.
pub async fn rate_limit_middleware(request: Request, next: Next) -> Response {
    let limiter = request.extensions().get::<RateLimiter>().cloned();

    if let Some(limiter) = limiter {
        let key = client_key(&request, limiter.config());
        if !limiter.check(&key) {
            tracing::warn!(client = %key, path = %request.uri().path(), "rate limit exceeded");
            let body = ErrorBody {
                error: ErrorDetail {
                    code: "RATE_LIMITED".to_string(),
                    message: "rate limit exceeded".to_string(),
                    details: None,
                },
            };
            return (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
        }
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_from(peer: &str, forwarded: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder();
        if let Some(hop) = forwarded {
            builder = builder.header("x-forwarded-for", hop);
        }
        let addr: SocketAddr = peer.parse().unwrap();
        builder
            .extension(ConnectInfo(addr))
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn allows_up_to_budget_then_refuses() {
        let limiter = RateLimiter::new(RateLimitConfig::per_minute(3));
        let now = Instant::now();
        assert!(limiter.check_at("10.0.0.1", now));
        assert!(limiter.check_at("10.0.0.1", now));
        assert!(limiter.check_at("10.0.0.1", now));
        assert!(!limiter.check_at("10.0.0.1", now));
        // Other clients have their own budget.
        assert!(limiter.check_at("10.0.0.2", now));
    }

    #[test]
    fn window_resets() {
        let limiter = RateLimiter::new(RateLimitConfig::per_minute(1));
        let start = Instant::now();
        assert!(limiter.check_at("k", start));
        assert!(!limiter.check_at("k", start + Duration::from_secs(59)));
        assert!(limiter.check_at("k", start + Duration::from_secs(60)));
    }

    #[test]
    fn zero_budget_disables_limiting() {
        let limiter = RateLimiter::new(RateLimitConfig::per_minute(0));
        for _ in 0..100 {
            assert!(limiter.check("k"));
        }
    }

    #[test]
    fn stale_windows_are_pruned_once_per_window() {
        let limiter = RateLimiter::new(RateLimitConfig::per_minute(5));
        let start = Instant::now();
        for i in 0..50 {
            assert!(limiter.check_at(&format!("10.0.0.{i}"), start));
        }
        assert_eq!(limiter.tracked_clients(), 50);

        assert!(limiter.check_at("10.0.1.1", start + Duration::from_secs(61)));
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn key_is_peer_ip_without_port() {
        let config = RateLimitConfig::per_minute(1);
        assert_eq!(client_key(&request_from("203.0.113.7:5000", None), &config), "203.0.113.7");
        assert_eq!(client_key(&request_from("203.0.113.7:5001", None), &config), "203.0.113.7");
    }

    #[test]
    fn forwarded_header_is_ignored_unless_trusted() {
        let config = RateLimitConfig::per_minute(1);
        let request = request_from("10.0.0.9:4000", Some(" 203.0.113.7 , 10.0.0.1"));
        assert_eq!(client_key(&request, &config), "10.0.0.9");

        let trusted = config.behind_proxy();
        assert_eq!(client_key(&request, &trusted), "203.0.113.7");
        // Trusted, but absent: fall back to the peer.
        assert_eq!(client_key(&request_from("10.0.0.9:4000", None), &trusted), "10.0.0.9");
    }

    #[test]
    fn unknown_peer_has_its_own_bucket() {
        let request = axum::http::Request::builder()
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_key(&request, &RateLimitConfig::per_minute(1)), "unknown");
    }
}
