//! # licd-api: Binary Entry Point
//!
//! Starts the license service. Configuration comes from the environment
//! (see [`AppConfig::from_env`]); listens on `PORT` (default 10000).

use std::net::SocketAddr;

use anyhow::Context;
use licd_api::db::licenses::PgLicenseStore;
use licd_api::state::{AppConfig, AppState, LicenseBackend};
use licd_registry::MemoryLicenseStore;

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::debug!(?config, "configuration loaded");

    if config.admin_secret.is_none() {
        tracing::error!(
            "ADMIN_TOKEN is not set: create, renew, reset, suspend and list \
             will answer 500 until it is configured"
        );
    }

    let pool = licd_api::db::init_pool(config.database_url.as_deref())
        .await
        .context("database initialization failed")?;
    let backend = match pool {
        Some(pool) => LicenseBackend::Postgres(PgLicenseStore::new(pool)),
        None => LicenseBackend::Memory(MemoryLicenseStore::new()),
    };
    tracing::info!(storage = backend.kind(), "license store ready");

    let port = config.port;
    let app = licd_api::app(AppState::new(config, backend));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("licd listening on {addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}
