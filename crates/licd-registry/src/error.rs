//! # Error Hierarchy
//!
//! Structured error types for the license registry, built with `thiserror`.
//!
//! [`RegistryError`] is what every registry operation returns. Its variants
//! are the complete set of outcomes a caller can observe; the HTTP layer maps
//! each one to a status code. [`StoreError`] covers failures of the storage
//! backend itself and is wrapped by [`RegistryError::Storage`].

use thiserror::Error;

/// Errors returned by [`Registry`](crate::Registry) operations.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// No license record exists for the username.
    #[error("license not found for user \"{0}\"")]
    NotFound(String),

    /// Password or license key did not match.
    #[error("invalid credentials")]
    BadCredentials,

    /// The license has been administratively suspended.
    #[error("license is suspended")]
    Suspended,

    /// The license is bound to a different machine.
    #[error("license is bound to a different machine")]
    MachineMismatch,

    /// The license expiration date is in the past.
    #[error("license expired on {0}")]
    Expired(chrono::NaiveDate),

    /// Missing or incorrect admin token.
    #[error("admin token rejected")]
    Unauthorized,

    /// A license already exists for the username.
    #[error("a license already exists for user \"{0}\"")]
    Conflict(String),

    /// Request field failed validation (unparsable date, empty field).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The service has no admin secret configured. Admin operations are
    /// refused rather than allowed through.
    #[error("admin secret is not configured on this server")]
    Misconfigured,

    /// Password hashing failed.
    #[error("password hashing failed: {0}")]
    Hashing(String),

    /// The storage backend failed.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl RegistryError {
    /// Whether the error is caused by the caller (as opposed to the server).
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            Self::Misconfigured | Self::Hashing(_) | Self::Storage(_)
        )
    }
}

/// Errors raised by a [`LicenseStore`](crate::store::LicenseStore) backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Insert-if-absent found an existing record with the same username.
    #[error("duplicate username \"{0}\"")]
    Duplicate(String),

    /// The backend could not complete the operation.
    #[error("backend failure: {0}")]
    Backend(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_classified() {
        assert!(RegistryError::NotFound("u".into()).is_client_error());
        assert!(RegistryError::BadCredentials.is_client_error());
        assert!(RegistryError::Unauthorized.is_client_error());
        assert!(!RegistryError::Misconfigured.is_client_error());
        assert!(!RegistryError::Storage(StoreError::Backend("down".into())).is_client_error());
    }

    #[test]
    fn display_carries_context() {
        let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert!(RegistryError::Expired(date).to_string().contains("2024-01-31"));
        assert!(RegistryError::Conflict("alice".into())
            .to_string()
            .contains("alice"));
    }

    #[test]
    fn store_error_converts() {
        let err: RegistryError = StoreError::Backend("connection reset".into()).into();
        assert!(matches!(err, RegistryError::Storage(_)));
        assert!(err.to_string().contains("connection reset"));
    }
}
