//! # License Registry
//!
//! Validation and lifecycle operations over a [`LicenseStore`].
//!
//! ## Verification order
//!
//! ```text
//! NotFound → BadCredentials (password) → BadCredentials (key) → Suspended
//!          → bind-if-unbound / MachineMismatch → Expired → Ok
//! ```
//!
//! Authentication failures are always reported before license-state
//! failures. Binding happens before the expiration check, so a correct
//! verification against an expired, unbound license binds it and then
//! reports `Expired`.
//!
//! ## Admin operations
//!
//! Create, renew, reset, suspend and list pass the admin gate first
//! (`Misconfigured`, then `Unauthorized`), then run their own checks.
//! Every mutation is a single store write, so a failed operation leaves the
//! record untouched.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::admin::{self, AdminSecret};
use crate::clock::{Clock, SystemClock};
use crate::error::{RegistryError, StoreError};
use crate::password;
use crate::record::{parse_date, Expiration, LicenseRecord, LicenseSummary};
use crate::store::{CasOutcome, LicenseStore};

/// Outcome of a successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    /// When the license stops being valid.
    pub expiration: Expiration,
    /// Whether this call bound the license to the presented machine.
    pub newly_bound: bool,
}

/// Fields of a new license.
#[derive(Debug, Clone)]
pub struct NewLicense<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub license_key: &'a str,
    /// `YYYY-MM-DD`, or `None` for an unlimited license.
    pub expiration_date: Option<&'a str>,
}

/// The license registry.
#[derive(Debug)]
pub struct Registry<S> {
    store: S,
    admin_secret: Option<AdminSecret>,
    clock: Arc<dyn Clock>,
}

impl<S: LicenseStore> Registry<S> {
    /// Create a registry over `store`, using the local calendar for expiry.
    ///
    /// `admin_secret = None` leaves every admin-gated operation refusing
    /// with [`RegistryError::Misconfigured`].
    pub fn new(store: S, admin_secret: Option<AdminSecret>) -> Self {
        Self::with_clock(store, admin_secret, Arc::new(SystemClock))
    }

    /// Create a registry with an explicit calendar source.
    pub fn with_clock(store: S, admin_secret: Option<AdminSecret>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            admin_secret,
            clock,
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Whether an admin secret was configured.
    pub fn admin_configured(&self) -> bool {
        self.admin_secret.is_some()
    }

    // -- Verification ---------------------------------------------------------

    /// Validate a license for a machine, binding it on first use.
    pub async fn verify(
        &self,
        username: &str,
        password: &str,
        license_key: &str,
        machine_id: &str,
    ) -> Result<Verification, RegistryError> {
        let record = self
            .store
            .get(username)
            .await?
            .ok_or_else(|| RegistryError::NotFound(username.to_string()))?;

        let password_ok =
            password::verify_password_async(password.to_string(), record.password_hash.clone())
                .await?;
        if !password_ok {
            tracing::debug!(username, "verification failed: wrong password");
            return Err(RegistryError::BadCredentials);
        }
        if !admin::constant_time_eq(license_key, &record.license_key) {
            tracing::debug!(username, "verification failed: wrong license key");
            return Err(RegistryError::BadCredentials);
        }

        if !record.active {
            return Err(RegistryError::Suspended);
        }
        if machine_id.trim().is_empty() {
            return Err(RegistryError::InvalidInput(
                "machine_id must not be empty".into(),
            ));
        }

        let newly_bound = self.bind_or_match(&record, machine_id).await?;

        if let Some(expiration_date) = record.expiration_date {
            if record.is_expired_on(self.clock.today()) {
                return Err(RegistryError::Expired(expiration_date));
            }
        }

        Ok(Verification {
            expiration: record.expiration_date.into(),
            newly_bound,
        })
    }

    /// Bind an unbound record to `machine_id`, or check an existing binding.
    ///
    /// Returns `true` when this call performed the binding.
    async fn bind_or_match(
        &self,
        record: &LicenseRecord,
        machine_id: &str,
    ) -> Result<bool, RegistryError> {
        if record.is_bound() {
            return if record.machine_id == machine_id {
                Ok(false)
            } else {
                Err(RegistryError::MachineMismatch)
            };
        }

        match self
            .store
            .compare_and_set_machine_id(&record.username, "", machine_id)
            .await?
        {
            CasOutcome::Applied => {
                tracing::info!(username = %record.username, machine_id, "license bound to machine");
                Ok(true)
            }
            // Lost the race to a concurrent verification from the same machine.
            CasOutcome::Current(winner) if winner == machine_id => Ok(false),
            CasOutcome::Current(_) => Err(RegistryError::MachineMismatch),
            CasOutcome::Missing => Err(RegistryError::NotFound(record.username.clone())),
        }
    }

    // -- Admin operations -----------------------------------------------------

    /// Issue a new license.
    pub async fn create_license(
        &self,
        admin_token: &str,
        license: NewLicense<'_>,
    ) -> Result<(), RegistryError> {
        self.authorize(admin_token)?;

        require_non_empty("username", license.username)?;
        require_non_empty("password", license.password)?;
        require_non_empty("license_key", license.license_key)?;

        if self.store.get(license.username).await?.is_some() {
            return Err(RegistryError::Conflict(license.username.to_string()));
        }
        let expiration_date = license.expiration_date.map(parse_date).transpose()?;

        let password_hash = password::hash_password_async(license.password.to_string()).await?;
        let record = LicenseRecord::issue(
            license.username,
            password_hash,
            license.license_key,
            expiration_date,
        );

        match self.store.insert_new(record).await {
            Ok(()) => {}
            Err(StoreError::Duplicate(username)) => return Err(RegistryError::Conflict(username)),
            Err(e) => return Err(e.into()),
        }

        tracing::info!(
            username = license.username,
            expiration = %Expiration::from(expiration_date),
            "license created"
        );
        Ok(())
    }

    /// Overwrite a license's expiration date. The new date may be earlier
    /// than the old one.
    pub async fn renew_license(
        &self,
        admin_token: &str,
        username: &str,
        new_expiration_date: &str,
    ) -> Result<NaiveDate, RegistryError> {
        self.authorize(admin_token)?;

        if self.store.get(username).await?.is_none() {
            return Err(RegistryError::NotFound(username.to_string()));
        }
        let date = parse_date(new_expiration_date)?;

        if !self.store.set_expiration(username, Some(date)).await? {
            return Err(RegistryError::NotFound(username.to_string()));
        }
        tracing::info!(username, expiration = %date, "license renewed");
        Ok(date)
    }

    /// Release the machine binding so the next verification can bind anew.
    pub async fn reset_license(&self, admin_token: &str, username: &str) -> Result<(), RegistryError> {
        self.authorize(admin_token)?;

        if !self.store.clear_machine_id(username).await? {
            return Err(RegistryError::NotFound(username.to_string()));
        }
        tracing::info!(username, "license machine binding reset");
        Ok(())
    }

    /// Suspend a license. There is no reactivation.
    pub async fn suspend_license(
        &self,
        admin_token: &str,
        username: &str,
    ) -> Result<(), RegistryError> {
        self.authorize(admin_token)?;

        if !self.store.deactivate(username).await? {
            return Err(RegistryError::NotFound(username.to_string()));
        }
        tracing::info!(username, "license suspended");
        Ok(())
    }

    /// Summaries of every license, ordered by username.
    pub async fn list_licenses(&self, admin_token: &str) -> Result<Vec<LicenseSummary>, RegistryError> {
        self.authorize(admin_token)?;

        let records = self.store.list().await?;
        Ok(records.iter().map(LicenseRecord::summary).collect())
    }

    fn authorize(&self, admin_token: &str) -> Result<(), RegistryError> {
        admin::authorize(self.admin_secret.as_ref(), admin_token)
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), RegistryError> {
    if value.trim().is_empty() {
        Err(RegistryError::InvalidInput(format!("{field} must not be empty")))
    } else {
        Ok(())
    }
}
