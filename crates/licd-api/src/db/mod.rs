//! # Database Persistence Layer
//!
//! Postgres persistence for license records via SQLx.
//!
//! The database is **optional**. When `DATABASE_URL` is set the server keeps
//! licenses in the `licenses` table (see `migrations/`). When absent it runs
//! with the in-memory store, which is fine for development and tests but
//! loses every license on restart.

pub mod licenses;

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Initialize the connection pool and run migrations.
///
/// Returns `None` when no database URL is configured (in-memory mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool(database_url: Option<&str>) -> Result<Option<PgPool>, sqlx::Error> {
    let Some(url) = database_url else {
        tracing::warn!(
            "DATABASE_URL not set: running with the in-memory license store. \
             Licenses will not survive restarts."
        );
        return Ok(None);
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .connect(url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}
