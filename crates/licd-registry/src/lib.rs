//! # licd-registry: License Registry
//!
//! The core of licd: license records and the rules that decide whether a
//! license is usable.
//!
//! A license is usable iff it is active, not past its expiration date, the
//! presented password and license key match, and it is either unbound or
//! bound to the presenting machine. The first successful verification binds
//! the license to that machine; only an administrator reset releases it.
//!
//! ## Modules
//!
//! - [`registry`]: verify, create, renew, reset, suspend, list.
//! - [`store`]: the [`LicenseStore`] seam and the in-memory arena store.
//! - [`record`]: [`LicenseRecord`], [`LicenseSummary`], date parsing.
//! - [`admin`]: the injected admin secret and constant-time comparison.
//! - [`password`]: argon2id hashing.
//! - [`clock`]: the calendar source for expiration checks.
//! - [`error`]: [`RegistryError`] and [`StoreError`].
//!
//! ## Crate Policy
//!
//! - No HTTP types here. The API crate maps [`RegistryError`] to responses.
//! - No `.unwrap()` outside tests.

pub mod admin;
pub mod clock;
pub mod error;
pub mod password;
pub mod record;
pub mod registry;
pub mod store;

pub use admin::AdminSecret;
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{RegistryError, StoreError};
pub use record::{parse_date, Expiration, LicenseRecord, LicenseSummary};
pub use registry::{NewLicense, Registry, Verification};
pub use store::{CasOutcome, LicenseStore, MemoryLicenseStore};
