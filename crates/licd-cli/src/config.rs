//! Client configuration: where the server lives and how to authenticate.
//!
//! The admin token is held in [`Zeroizing`] and never printed; `Debug`
//! redacts it.

use std::time::Duration;

use url::Url;
use zeroize::Zeroizing;

/// Default server address.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:10000";

/// Default request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Configuration for [`LicdClient`](crate::client::LicdClient).
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL of the licd server.
    pub base_url: Url,
    /// Admin token for lifecycle commands. Not needed for `verify`.
    pub admin_token: Option<Zeroizing<String>>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ClientConfig {
    /// Build a configuration, parsing and normalizing the server URL.
    pub fn new(
        server: &str,
        admin_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, url::ParseError> {
        let mut base_url = Url::parse(server)?;
        // Url::join drops the last path segment unless the base ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            base_url,
            admin_token: admin_token
                .filter(|t| !t.trim().is_empty())
                .map(Zeroizing::new),
            timeout,
        })
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url.as_str())
            .field(
                "admin_token",
                &self.admin_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("timeout", &self.timeout)
            .finish()
    }
}
