//! # licd-cli: Command-Line Client for licd
//!
//! Administers licenses on a running `licd-api` server and verifies them
//! the way a licensed application would.
//!
//! ## Modules
//!
//! - [`client`]: typed HTTP client, one method per endpoint.
//! - [`config`]: server URL, admin token and timeout.
//! - [`commands`]: clap subcommands and their handlers.
//! - [`report`]: activation and expiry status for `licd list`.

pub mod client;
pub mod commands;
pub mod config;
pub mod report;

pub use client::{ClientError, LicdClient};
pub use config::ClientConfig;
