//! # License Records
//!
//! The unit of state per username, the listing projection that leaves out
//! the password hash, and the calendar-date helpers shared by create, renew
//! and verify.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// A stored license. One per username.
///
/// `machine_id` is empty until the first successful verification binds it.
/// Only [`Registry::verify`](crate::Registry::verify) (binding) and
/// [`Registry::reset_license`](crate::Registry::reset_license) (clearing)
/// write to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseRecord {
    pub username: String,
    /// Argon2id hash in PHC string format.
    pub password_hash: String,
    pub license_key: String,
    /// `None` means the license never expires.
    pub expiration_date: Option<NaiveDate>,
    pub machine_id: String,
    /// `false` once an administrator suspends the license.
    pub active: bool,
}

impl LicenseRecord {
    /// A freshly issued record: unbound and active.
    pub fn issue(
        username: impl Into<String>,
        password_hash: impl Into<String>,
        license_key: impl Into<String>,
        expiration_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            username: username.into(),
            password_hash: password_hash.into(),
            license_key: license_key.into(),
            expiration_date,
            machine_id: String::new(),
            active: true,
        }
    }

    /// Whether a machine has been bound to this license.
    pub fn is_bound(&self) -> bool {
        !self.machine_id.is_empty()
    }

    /// Whether the license has expired as of `today`.
    ///
    /// The expiration date itself is still a valid day.
    pub fn is_expired_on(&self, today: NaiveDate) -> bool {
        matches!(self.expiration_date, Some(exp) if today > exp)
    }

    /// The listing projection of this record.
    pub fn summary(&self) -> LicenseSummary {
        LicenseSummary {
            username: self.username.clone(),
            license_key: self.license_key.clone(),
            machine_id: self.machine_id.clone(),
            expiration_date: self.expiration_date,
            active: self.active,
        }
    }
}

/// What an administrator sees when listing licenses.
///
/// Deliberately has no password hash field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseSummary {
    pub username: String,
    pub license_key: String,
    pub machine_id: String,
    /// Serialized as `YYYY-MM-DD`, or `null` for unlimited licenses.
    pub expiration_date: Option<NaiveDate>,
    pub active: bool,
}

/// The validity horizon reported by a successful verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiration {
    Unlimited,
    Until(NaiveDate),
}

impl Expiration {
    /// The expiration date, if any.
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Self::Unlimited => None,
            Self::Until(date) => Some(*date),
        }
    }
}

impl From<Option<NaiveDate>> for Expiration {
    fn from(date: Option<NaiveDate>) -> Self {
        date.map_or(Self::Unlimited, Self::Until)
    }
}

impl std::fmt::Display for Expiration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unlimited => f.write_str("unlimited"),
            Self::Until(date) => write!(f, "{date}"),
        }
    }
}

/// Parse a calendar date in `YYYY-MM-DD` form.
pub fn parse_date(raw: &str) -> Result<NaiveDate, RegistryError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        RegistryError::InvalidInput(format!(
            "invalid date \"{raw}\" (expected YYYY-MM-DD)"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn issued_record_is_unbound_and_active() {
        let rec = LicenseRecord::issue("u1", "$argon2id$...", "K-1", None);
        assert!(!rec.is_bound());
        assert!(rec.active);
        assert_eq!(rec.machine_id, "");
    }

    #[test]
    fn expiration_day_is_still_valid() {
        let rec = LicenseRecord::issue("u1", "h", "K-1", Some(date(2025, 6, 30)));
        assert!(!rec.is_expired_on(date(2025, 6, 30)));
        assert!(rec.is_expired_on(date(2025, 7, 1)));
        assert!(!rec.is_expired_on(date(2025, 1, 1)));
    }

    #[test]
    fn unlimited_never_expires() {
        let rec = LicenseRecord::issue("u1", "h", "K-1", None);
        assert!(!rec.is_expired_on(date(9999, 12, 31)));
    }

    #[test]
    fn summary_omits_password_hash() {
        let rec = LicenseRecord::issue("u1", "secret-hash", "K-1", Some(date(2099, 1, 1)));
        let json = serde_json::to_string(&rec.summary()).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(!json.contains("password"));
        assert!(json.contains("\"expiration_date\":\"2099-01-01\""));
    }

    #[test]
    fn summary_serializes_missing_date_as_null() {
        let rec = LicenseRecord::issue("u1", "h", "K-1", None);
        let json = serde_json::to_value(rec.summary()).unwrap();
        assert!(json["expiration_date"].is_null());
        assert_eq!(json["active"], true);
    }

    #[test]
    fn parse_date_accepts_iso_dates() {
        assert_eq!(parse_date("2026-12-30").unwrap(), date(2026, 12, 30));
        assert_eq!(parse_date(" 2026-02-12 ").unwrap(), date(2026, 2, 12));
    }

    #[test]
    fn parse_date_rejects_garbage() {
        for raw in ["", "tomorrow", "2026-13-01", "2026-02-30", "30/12/2026"] {
            let err = parse_date(raw).unwrap_err();
            assert!(matches!(err, RegistryError::InvalidInput(_)), "{raw}");
        }
    }

    #[test]
    fn expiration_display() {
        assert_eq!(Expiration::Unlimited.to_string(), "unlimited");
        assert_eq!(Expiration::Until(date(2030, 1, 2)).to_string(), "2030-01-02");
        assert_eq!(Expiration::from(None).date(), None);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn formatted_dates_parse_back(days in 0i64..200_000) {
                let d = date(1970, 1, 1) + chrono::Duration::days(days);
                let raw = d.format("%Y-%m-%d").to_string();
                prop_assert_eq!(parse_date(&raw).unwrap(), d);
            }

            #[test]
            fn non_date_strings_are_rejected(raw in "[a-zA-Z ]{0,16}") {
                prop_assert!(parse_date(&raw).is_err());
            }
        }
    }
}
