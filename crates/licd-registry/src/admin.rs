//! # Admin Gate
//!
//! Every lifecycle operation except verification is authorized by a shared
//! admin token. The expected secret is injected at startup as an
//! `Option<AdminSecret>`; `None` means the server was started without one and
//! all admin-gated operations fail with [`RegistryError::Misconfigured`].

use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::error::RegistryError;

/// The server-side admin token.
///
/// Zeroized on drop. Custom `Debug` redacts the value so it never reaches
/// the logs.
#[derive(Clone)]
pub struct AdminSecret(Zeroizing<String>);

impl AdminSecret {
    /// Wrap a configured secret. Blank secrets are rejected so that an
    /// empty `ADMIN_TOKEN` cannot be matched by an empty request field.
    pub fn new(secret: impl Into<String>) -> Option<Self> {
        let secret = secret.into();
        if secret.trim().is_empty() {
            None
        } else {
            Some(Self(Zeroizing::new(secret)))
        }
    }

    /// Constant-time check of a presented token.
    pub fn matches(&self, presented: &str) -> bool {
        constant_time_eq(presented, self.0.as_str())
    }
}

impl std::fmt::Debug for AdminSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AdminSecret([REDACTED])")
    }
}

/// Authorize an admin operation.
///
/// Missing configuration is checked first so that a misconfigured server
/// reports itself instead of blaming the caller.
pub fn authorize(secret: Option<&AdminSecret>, presented: &str) -> Result<(), RegistryError> {
    let secret = secret.ok_or(RegistryError::Misconfigured)?;
    if secret.matches(presented) {
        Ok(())
    } else {
        tracing::warn!("admin operation rejected: invalid admin token");
        Err(RegistryError::Unauthorized)
    }
}

/// Constant-time string equality.
///
/// When lengths differ, performs a dummy comparison so the timing does not
/// depend on how much of the input matched.
pub fn constant_time_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_secret_is_not_a_secret() {
        assert!(AdminSecret::new("").is_none());
        assert!(AdminSecret::new("   ").is_none());
        assert!(AdminSecret::new("s3cret").is_some());
    }

    #[test]
    fn authorize_requires_configuration() {
        let err = authorize(None, "anything").unwrap_err();
        assert!(matches!(err, RegistryError::Misconfigured));
    }

    #[test]
    fn authorize_checks_token() {
        let secret = AdminSecret::new("s3cret").unwrap();
        assert!(authorize(Some(&secret), "s3cret").is_ok());
        assert!(matches!(
            authorize(Some(&secret), "s3cre"),
            Err(RegistryError::Unauthorized)
        ));
        assert!(matches!(
            authorize(Some(&secret), ""),
            Err(RegistryError::Unauthorized)
        ));
    }

    #[test]
    fn constant_time_eq_cases() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("ab", "abc"));
        assert!(!constant_time_eq("", "abc"));
        assert!(constant_time_eq("", ""));
    }

    #[test]
    fn debug_redacts_secret() {
        let secret = AdminSecret::new("hunter2").unwrap();
        let out = format!("{secret:?}");
        assert!(!out.contains("hunter2"));
        assert!(out.contains("REDACTED"));
    }
}
