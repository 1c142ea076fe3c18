//! Human-readable license status for `licd list`.
//!
//! Expiry is judged against a given calendar date: a license is `expired`
//! once its date is in the past, and flagged as expiring soon within
//! [`EXPIRY_WARNING_DAYS`] days.

use std::fmt;

use chrono::NaiveDate;
use licd_registry::LicenseSummary;
use serde::Serialize;

/// Licenses expiring within this many days are flagged.
pub const EXPIRY_WARNING_DAYS: i64 = 7;

/// Where a license stands relative to its expiration date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "days", rename_all = "snake_case")]
pub enum ExpiryStatus {
    Unlimited,
    /// Days since the expiration date.
    Expired(i64),
    /// Days left, at most [`EXPIRY_WARNING_DAYS`].
    ExpiresSoon(i64),
    /// Days left.
    Remaining(i64),
}

impl ExpiryStatus {
    pub fn evaluate(expiration_date: Option<NaiveDate>, today: NaiveDate) -> Self {
        let Some(date) = expiration_date else {
            return Self::Unlimited;
        };
        let days_left = (date - today).num_days();
        if days_left < 0 {
            Self::Expired(-days_left)
        } else if days_left <= EXPIRY_WARNING_DAYS {
            Self::ExpiresSoon(days_left)
        } else {
            Self::Remaining(days_left)
        }
    }
}

impl fmt::Display for ExpiryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unlimited => f.write_str("unlimited"),
            Self::Expired(_) => f.write_str("expired"),
            Self::ExpiresSoon(0) => f.write_str("expires today"),
            Self::ExpiresSoon(1) => f.write_str("expires in 1 day"),
            Self::ExpiresSoon(days) => write!(f, "expires in {days} days"),
            Self::Remaining(days) => write!(f, "{days} days remaining"),
        }
    }
}

/// One row of `licd list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LicenseReport {
    pub username: String,
    pub license_key: String,
    pub machine_id: String,
    pub expiration_date: Option<NaiveDate>,
    pub activated: bool,
    pub suspended: bool,
    pub expiry: ExpiryStatus,
}

impl LicenseReport {
    pub fn new(summary: &LicenseSummary, today: NaiveDate) -> Self {
        Self {
            username: summary.username.clone(),
            license_key: summary.license_key.clone(),
            machine_id: summary.machine_id.clone(),
            expiration_date: summary.expiration_date,
            activated: !summary.machine_id.is_empty(),
            suspended: !summary.active,
            expiry: ExpiryStatus::evaluate(summary.expiration_date, today),
        }
    }

    /// One-word activation state.
    pub fn activation(&self) -> &'static str {
        if self.activated {
            "activated"
        } else {
            "not activated"
        }
    }
}

impl fmt::Display for LicenseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let expiration = self
            .expiration_date
            .map_or_else(|| "never".to_string(), |d| d.to_string());
        let machine = if self.machine_id.is_empty() {
            "-"
        } else {
            self.machine_id.as_str()
        };
        writeln!(f, "User       : {}", self.username)?;
        writeln!(f, "Key        : {}", self.license_key)?;
        writeln!(f, "Machine    : {machine}")?;
        writeln!(f, "Expires    : {expiration} ({})", self.expiry)?;
        write!(f, "Status     : {}", self.activation())?;
        if self.suspended {
            write!(f, ", suspended")?;
        }
        Ok(())
    }
}

/// Reports for every license, in the order given.
pub fn build(summaries: &[LicenseSummary], today: NaiveDate) -> Vec<LicenseReport> {
    summaries
        .iter()
        .map(|s| LicenseReport::new(s, today))
        .collect()
}

/// Text rendering: one block per license, separated by blank lines.
pub fn render_text(reports: &[LicenseReport]) -> String {
    if reports.is_empty() {
        return "no licenses".to_string();
    }
    reports
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn summary(machine_id: &str, expiration_date: Option<NaiveDate>, active: bool) -> LicenseSummary {
        LicenseSummary {
            username: "u1".into(),
            license_key: "K-1".into(),
            machine_id: machine_id.into(),
            expiration_date,
            active,
        }
    }

    #[test]
    fn expiry_thresholds() {
        let today = date(2026, 3, 1);
        assert_eq!(ExpiryStatus::evaluate(None, today), ExpiryStatus::Unlimited);
        assert_eq!(
            ExpiryStatus::evaluate(Some(date(2026, 2, 27)), today),
            ExpiryStatus::Expired(2)
        );
        assert_eq!(
            ExpiryStatus::evaluate(Some(today), today),
            ExpiryStatus::ExpiresSoon(0)
        );
        assert_eq!(
            ExpiryStatus::evaluate(Some(date(2026, 3, 8)), today),
            ExpiryStatus::ExpiresSoon(7)
        );
        assert_eq!(
            ExpiryStatus::evaluate(Some(date(2026, 3, 9)), today),
            ExpiryStatus::Remaining(8)
        );
    }

    #[test]
    fn expiry_display() {
        assert_eq!(ExpiryStatus::Unlimited.to_string(), "unlimited");
        assert_eq!(ExpiryStatus::Expired(3).to_string(), "expired");
        assert_eq!(ExpiryStatus::ExpiresSoon(5).to_string(), "expires in 5 days");
        assert_eq!(ExpiryStatus::Remaining(30).to_string(), "30 days remaining");
    }

    #[test]
    fn activation_follows_machine_binding() {
        let today = date(2026, 3, 1);
        let bound = LicenseReport::new(&summary("M1", None, true), today);
        assert!(bound.activated);
        assert_eq!(bound.activation(), "activated");

        let unbound = LicenseReport::new(&summary("", None, false), today);
        assert_eq!(unbound.activation(), "not activated");
        assert!(unbound.suspended);
        let text = unbound.to_string();
        assert!(text.contains("not activated, suspended"));
        assert!(text.contains("Machine    : -"));
    }

    #[test]
    fn render_empty_list() {
        assert_eq!(render_text(&[]), "no licenses");
    }

    #[test]
    fn json_shape() {
        let report = LicenseReport::new(&summary("M1", Some(date(2026, 3, 4)), true), date(2026, 3, 1));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["expiry"]["state"], "expires_soon");
        assert_eq!(json["expiry"]["days"], 3);
        assert_eq!(json["expiration_date"], "2026-03-04");
    }
}
