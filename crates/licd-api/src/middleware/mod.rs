//! # Middleware
//!
//! - [`rate_limit`]: fixed-window per-client throttling (429 `RATE_LIMITED`).
//! - [`tracing_layer`]: request spans via `tower_http`.

pub mod rate_limit;
pub mod tracing_layer;
