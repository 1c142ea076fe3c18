//! Typed HTTP client for the licd API.
//!
//! One method per endpoint. Non-2xx responses are decoded from the server's
//! structured error body into [`ClientError::Api`].

use chrono::NaiveDate;
use licd_registry::LicenseSummary;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::config::ClientConfig;

/// Errors from [`LicdClient`] calls.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport failure: connection refused, timeout, TLS.
    #[error("request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with an error status.
    #[error("{endpoint} returned {status} {code}: {message}")]
    Api {
        endpoint: String,
        status: u16,
        code: String,
        message: String,
        /// Why a verification was refused, when the server says.
        reason: Option<String>,
    },

    /// A success response did not have the expected shape.
    #[error("unexpected response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    #[error("invalid server URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("an admin token is required (use --admin-token or ADMIN_TOKEN)")]
    MissingAdminToken,
}

impl ClientError {
    /// HTTP status of an API error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// -- Wire types --------------------------------------------------------------

#[derive(Serialize)]
struct VerifyBody<'a> {
    username: &'a str,
    password: &'a str,
    license_key: &'a str,
    machine_id: &'a str,
}

#[derive(Serialize)]
struct CreateBody<'a> {
    admin_token: &'a str,
    username: &'a str,
    password: &'a str,
    license_key: &'a str,
    expiration_date: Option<NaiveDate>,
}

#[derive(Serialize)]
struct RenewBody<'a> {
    admin_token: &'a str,
    username: &'a str,
    new_expiration_date: NaiveDate,
}

#[derive(Serialize)]
struct UsernameBody<'a> {
    admin_token: &'a str,
    username: &'a str,
}

/// Successful verification.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VerifyOutcome {
    pub success: bool,
    pub message: String,
    pub expiration_date: Option<NaiveDate>,
}

/// Successful create, reset or suspend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ActionOutcome {
    pub success: bool,
    pub message: String,
}

/// Successful renewal.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RenewOutcome {
    pub success: bool,
    pub message: String,
    pub new_expiration_date: NaiveDate,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorPayload,
}

#[derive(Deserialize)]
struct ErrorPayload {
    code: String,
    message: String,
    #[serde(default)]
    details: Option<serde_json::Value>,
}

/// Fields of a license to issue.
#[derive(Debug, Clone, Copy)]
pub struct NewLicense<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub license_key: &'a str,
    pub expiration_date: Option<NaiveDate>,
}

// -- Client ------------------------------------------------------------------

/// HTTP client for a licd server.
#[derive(Debug, Clone)]
pub struct LicdClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl LicdClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("licd-cli/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| ClientError::Http {
                endpoint: "client_init".into(),
                source,
            })?;
        Ok(Self { http, config })
    }

    /// `POST /verify`.
    pub async fn verify(
        &self,
        username: &str,
        password: &str,
        license_key: &str,
        machine_id: &str,
    ) -> Result<VerifyOutcome, ClientError> {
        let body = VerifyBody {
            username,
            password,
            license_key,
            machine_id,
        };
        self.post("verify", &body).await
    }

    /// `POST /create_license`.
    pub async fn create_license(&self, license: NewLicense<'_>) -> Result<ActionOutcome, ClientError> {
        let body = CreateBody {
            admin_token: self.admin_token()?,
            username: license.username,
            password: license.password,
            license_key: license.license_key,
            expiration_date: license.expiration_date,
        };
        self.post("create_license", &body).await
    }

    /// `POST /renew_license`.
    pub async fn renew_license(
        &self,
        username: &str,
        new_expiration_date: NaiveDate,
    ) -> Result<RenewOutcome, ClientError> {
        let body = RenewBody {
            admin_token: self.admin_token()?,
            username,
            new_expiration_date,
        };
        self.post("renew_license", &body).await
    }

    /// `POST /reset_license`.
    pub async fn reset_license(&self, username: &str) -> Result<ActionOutcome, ClientError> {
        let body = UsernameBody {
            admin_token: self.admin_token()?,
            username,
        };
        self.post("reset_license", &body).await
    }

    /// `POST /suspend_license`.
    pub async fn suspend_license(&self, username: &str) -> Result<ActionOutcome, ClientError> {
        let body = UsernameBody {
            admin_token: self.admin_token()?,
            username,
        };
        self.post("suspend_license", &body).await
    }

    /// `GET /licenses`.
    pub async fn list_licenses(&self) -> Result<Vec<LicenseSummary>, ClientError> {
        let token = self.admin_token()?;
        let mut url = self.endpoint("licenses")?;
        url.query_pairs_mut().append_pair("admin_token", token);

        tracing::debug!(endpoint = "licenses", "GET");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| ClientError::Http {
                endpoint: "licenses".into(),
                source,
            })?;
        decode(response, "licenses").await
    }

    fn admin_token(&self) -> Result<&str, ClientError> {
        self.config
            .admin_token
            .as_ref()
            .map(|t| t.as_str())
            .ok_or(ClientError::MissingAdminToken)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.config.base_url.join(path)?)
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &'static str,
        body: &B,
    ) -> Result<T, ClientError> {
        let url = self.endpoint(path)?;
        tracing::debug!(endpoint = path, "POST");
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|source| ClientError::Http {
                endpoint: path.into(),
                source,
            })?;
        decode(response, path).await
    }
}

async fn decode<T: DeserializeOwned>(
    response: reqwest::Response,
    endpoint: &str,
) -> Result<T, ClientError> {
    let status = response.status();
    let bytes = response.bytes().await.map_err(|source| ClientError::Http {
        endpoint: endpoint.into(),
        source,
    })?;

    if status.is_success() {
        return serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode {
            endpoint: endpoint.into(),
            message: e.to_string(),
        });
    }

    Err(api_error(endpoint, status, &bytes))
}

fn api_error(endpoint: &str, status: StatusCode, bytes: &[u8]) -> ClientError {
    match serde_json::from_slice::<ErrorEnvelope>(bytes) {
        Ok(envelope) => {
            let reason = envelope
                .error
                .details
                .as_ref()
                .and_then(|d| d.get("reason"))
                .and_then(|r| r.as_str())
                .map(str::to_string);
            ClientError::Api {
                endpoint: endpoint.into(),
                status: status.as_u16(),
                code: envelope.error.code,
                message: envelope.error.message,
                reason,
            }
        }
        Err(_) => ClientError::Api {
            endpoint: endpoint.into(),
            status: status.as_u16(),
            code: "UNKNOWN".into(),
            message: String::from_utf8_lossy(bytes).into_owned(),
            reason: None,
        },
    }
}
