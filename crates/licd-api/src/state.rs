//! # Application State
//!
//! Shared state passed to all Axum route handlers via the `State` extractor,
//! plus the environment-driven [`AppConfig`].
//!
//! The registry is generic over its store; the server picks one at startup.
//! [`LicenseBackend`] closes over the two stores the binary can run with so
//! handlers see a single concrete type.

use std::sync::Arc;

use chrono::NaiveDate;
use licd_registry::{
    AdminSecret, CasOutcome, LicenseRecord, LicenseStore, MemoryLicenseStore, Registry, StoreError,
};
use thiserror::Error;

use crate::db::licenses::PgLicenseStore;
use crate::middleware::rate_limit::RateLimitConfig;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 10000;

/// Default per-client request budget per minute.
pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u64 = 120;

/// Errors raised while reading configuration from the environment.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Application configuration.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Admin secret. `None` leaves every admin endpoint answering 500.
    pub admin_secret: Option<AdminSecret>,
    /// Postgres connection string. `None` runs with the in-memory store.
    pub database_url: Option<String>,
    /// Per-client rate limit.
    pub rate_limit: RateLimitConfig,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("admin_secret", &self.admin_secret)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("rate_limit", &self.rate_limit)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            admin_secret: None,
            database_url: None,
            rate_limit: RateLimitConfig::per_minute(DEFAULT_RATE_LIMIT_PER_MINUTE),
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    ///
    /// | Variable                | Default  |
    /// |-------------------------|----------|
    /// | `PORT`                  | `10000`  |
    /// | `ADMIN_TOKEN`           | unset    |
    /// | `DATABASE_URL`          | unset    |
    /// | `RATE_LIMIT_PER_MINUTE` | `120`    |
    /// | `TRUST_FORWARDED_FOR`   | `false`  |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("PORT") {
            Some(raw) => parse_var("PORT", raw)?,
            None => DEFAULT_PORT,
        };
        let per_minute = match lookup("RATE_LIMIT_PER_MINUTE") {
            Some(raw) => parse_var("RATE_LIMIT_PER_MINUTE", raw)?,
            None => DEFAULT_RATE_LIMIT_PER_MINUTE,
        };
        let trust_forwarded_for = match lookup("TRUST_FORWARDED_FOR") {
            Some(raw) => parse_var("TRUST_FORWARDED_FOR", raw)?,
            None => false,
        };
        let mut rate_limit = RateLimitConfig::per_minute(per_minute);
        if trust_forwarded_for {
            rate_limit = rate_limit.behind_proxy();
        }
        let admin_secret = lookup("ADMIN_TOKEN").and_then(AdminSecret::new);
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        Ok(Self {
            port,
            admin_secret,
            database_url,
            rate_limit,
        })
    }
}

fn parse_var<T>(var: &'static str, raw: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw.trim().parse::<T>() {
        Ok(value) => Ok(value),
        Err(e) => Err(ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value: raw,
        }),
    }
}

/// The store the server runs with.
#[derive(Debug, Clone)]
pub enum LicenseBackend {
    /// Process-local; contents are lost on restart.
    Memory(MemoryLicenseStore),
    /// Durable, shared across replicas.
    Postgres(PgLicenseStore),
}

impl LicenseBackend {
    /// Whether the backend can serve requests.
    pub async fn is_ready(&self) -> bool {
        match self {
            Self::Memory(_) => true,
            Self::Postgres(store) => store.ping().await.is_ok(),
        }
    }

    /// Short backend name for logs and probes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Postgres(_) => "postgres",
        }
    }
}

impl LicenseStore for LicenseBackend {
    async fn get(&self, username: &str) -> Result<Option<LicenseRecord>, StoreError> {
        match self {
            Self::Memory(s) => s.get(username).await,
            Self::Postgres(s) => s.get(username).await,
        }
    }

    async fn insert_new(&self, record: LicenseRecord) -> Result<(), StoreError> {
        match self {
            Self::Memory(s) => s.insert_new(record).await,
            Self::Postgres(s) => s.insert_new(record).await,
        }
    }

    async fn compare_and_set_machine_id(
        &self,
        username: &str,
        expected: &str,
        new: &str,
    ) -> Result<CasOutcome, StoreError> {
        match self {
            Self::Memory(s) => s.compare_and_set_machine_id(username, expected, new).await,
            Self::Postgres(s) => s.compare_and_set_machine_id(username, expected, new).await,
        }
    }

    async fn clear_machine_id(&self, username: &str) -> Result<bool, StoreError> {
        match self {
            Self::Memory(s) => s.clear_machine_id(username).await,
            Self::Postgres(s) => s.clear_machine_id(username).await,
        }
    }

    async fn set_expiration(
        &self,
        username: &str,
        expiration_date: Option<NaiveDate>,
    ) -> Result<bool, StoreError> {
        match self {
            Self::Memory(s) => s.set_expiration(username, expiration_date).await,
            Self::Postgres(s) => s.set_expiration(username, expiration_date).await,
        }
    }

    async fn deactivate(&self, username: &str) -> Result<bool, StoreError> {
        match self {
            Self::Memory(s) => s.deactivate(username).await,
            Self::Postgres(s) => s.deactivate(username).await,
        }
    }

    async fn list(&self) -> Result<Vec<LicenseRecord>, StoreError> {
        match self {
            Self::Memory(s) => s.list().await,
            Self::Postgres(s) => s.list().await,
        }
    }
}

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub registry: Arc<Registry<LicenseBackend>>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Build state over the given backend.
    pub fn new(config: AppConfig, backend: LicenseBackend) -> Self {
        let registry = Registry::new(backend, config.admin_secret.clone());
        Self::with_registry(config, registry)
    }

    /// Build state around a pre-built registry (tests inject a fixed clock).
    pub fn with_registry(config: AppConfig, registry: Registry<LicenseBackend>) -> Self {
        Self {
            registry: Arc::new(registry),
            config: Arc::new(config),
        }
    }

    /// In-memory state, for tests and database-less runs.
    pub fn in_memory(config: AppConfig) -> Self {
        Self::new(config, LicenseBackend::Memory(MemoryLicenseStore::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(config.admin_secret.is_none());
        assert!(config.database_url.is_none());
        assert_eq!(config.rate_limit.max_requests, DEFAULT_RATE_LIMIT_PER_MINUTE);
        assert!(!config.rate_limit.trust_forwarded_for);
    }

    #[test]
    fn reads_all_variables() {
        let config = AppConfig::from_lookup(lookup(&[
            ("PORT", "8081"),
            ("ADMIN_TOKEN", "s3cret"),
            ("DATABASE_URL", "postgres://licd:pw@db/licd"),
            ("RATE_LIMIT_PER_MINUTE", "5"),
            ("TRUST_FORWARDED_FOR", "true"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8081);
        assert!(config.admin_secret.unwrap().matches("s3cret"));
        assert_eq!(config.database_url.as_deref(), Some("postgres://licd:pw@db/licd"));
        assert_eq!(config.rate_limit.max_requests, 5);
        assert!(config.rate_limit.trust_forwarded_for);
    }

    #[test]
    fn blank_values_are_treated_as_unset() {
        let config =
            AppConfig::from_lookup(lookup(&[("ADMIN_TOKEN", "  "), ("DATABASE_URL", "")])).unwrap();
        assert!(config.admin_secret.is_none());
        assert!(config.database_url.is_none());
    }

    #[test]
    fn invalid_port_is_an_error() {
        let err = AppConfig::from_lookup(lookup(&[("PORT", "http")])).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn invalid_trust_flag_is_an_error() {
        let err = AppConfig::from_lookup(lookup(&[("TRUST_FORWARDED_FOR", "yes")])).unwrap_err();
        assert!(err.to_string().contains("TRUST_FORWARDED_FOR"));
    }

    #[test]
    fn debug_redacts_secrets() {
        let config = AppConfig::from_lookup(lookup(&[
            ("ADMIN_TOKEN", "topsecret"),
            ("DATABASE_URL", "postgres://licd:hunter2@db/licd"),
        ]))
        .unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("topsecret"));
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("REDACTED"));
    }

    #[tokio::test]
    async fn memory_backend_is_always_ready() {
        let backend = LicenseBackend::Memory(MemoryLicenseStore::new());
        assert!(backend.is_ready().await);
        assert_eq!(backend.kind(), "memory");
    }
}
