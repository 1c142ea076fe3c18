//! # licd-api: HTTP Service for the License Registry
//!
//! Exposes [`licd_registry::Registry`] over HTTP with Axum.
//!
//! ## API Surface
//!
//! | Route                   | Module               | Auth               |
//! |-------------------------|----------------------|--------------------|
//! | `POST /verify`          | [`routes::verify`]   | none               |
//! | `POST /create_license`  | [`routes::admin`]    | admin token (body) |
//! | `POST /renew_license`   | [`routes::admin`]    | admin token (body) |
//! | `POST /reset_license`   | [`routes::admin`]    | admin token (body) |
//! | `POST /suspend_license` | [`routes::admin`]    | admin token (body) |
//! | `GET /licenses`         | [`routes::admin`]    | admin token (query)|
//! | `GET /`, `/health/*`    | [`routes::health`]   | none               |
//! | `GET /openapi.json`     | [`openapi`]          | none               |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → RateLimitMiddleware → Handler
//! ```
//!
//! Health probes are mounted outside the rate limiter.

pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::middleware::from_fn;
use axum::Router;

use crate::middleware::rate_limit::RateLimiter;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let limiter = RateLimiter::new(state.config.rate_limit.clone());

    let api = Router::new()
        .merge(routes::verify::router())
        .merge(routes::admin::router())
        .merge(openapi::router())
        .layer(from_fn(middleware::rate_limit::rate_limit_middleware))
        .layer(middleware::tracing_layer::layer())
        .layer(axum::Extension(limiter))
        .with_state(state.clone());

    let health = routes::health::router().with_state(state);

    Router::new().merge(health).merge(api)
}
