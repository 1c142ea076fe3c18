//! # licd CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use licd_cli::commands::{self, Command};
use licd_cli::config::{DEFAULT_SERVER_URL, DEFAULT_TIMEOUT_SECS};
use licd_cli::{ClientConfig, LicdClient};

/// Issue, administer and verify software licenses.
#[derive(Parser)]
#[command(name = "licd", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Base URL of the licd server.
    #[arg(long, env = "LICD_SERVER_URL", default_value = DEFAULT_SERVER_URL, global = true)]
    server: String,

    /// Admin token for create, renew, reset, suspend and list.
    #[arg(long, env = "ADMIN_TOKEN", hide_env_values = true, global = true)]
    admin_token: Option<String>,

    /// Request timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, global = true)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = run(cli).await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ClientConfig::new(
        &cli.server,
        cli.admin_token,
        Duration::from_secs(cli.timeout_secs),
    )?;
    tracing::debug!(?config, "client configured");
    let client = LicdClient::new(config)?;
    commands::run(cli.command, &client).await
}
