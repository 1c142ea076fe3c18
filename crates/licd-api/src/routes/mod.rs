//! # API Route Modules
//!
//! - `verify`: unauthenticated license verification with first-use binding.
//! - `admin`: admin-token gated create, renew, reset, suspend and list.
//! - `health`: service banner and liveness/readiness probes.

pub mod admin;
pub mod health;
pub mod verify;
