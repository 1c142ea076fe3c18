//! # License Store
//!
//! The persistence seam of the registry. A [`LicenseStore`] is a keyed
//! collection of [`LicenseRecord`]s with per-record atomic writes:
//!
//! - `insert_new` is insert-if-absent, so two concurrent creates for the
//!   same username cannot both succeed.
//! - `compare_and_set_machine_id` is the only conditional write. It is what
//!   makes first-use binding race-free: exactly one caller moves a record
//!   from unbound to bound, every other caller is told the winning value.
//!
//! [`MemoryLicenseStore`] keeps records in an arena keyed by username. The
//! map lock is held only long enough to find or insert a record cell; each
//! record then has its own mutex, so operations on different usernames never
//! wait on each other.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::{Mutex, RwLock};

use crate::error::StoreError;
use crate::record::LicenseRecord;

/// Result of a compare-and-set on a record's `machine_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CasOutcome {
    /// The record held the expected value and now holds the new one.
    Applied,
    /// The record held a different value, returned here unchanged.
    Current(String),
    /// No record for the username.
    Missing,
}

/// Keyed, durable collection of license records.
///
/// Mutators that target an existing record return `Ok(false)` when the
/// username is unknown.
pub trait LicenseStore: Send + Sync {
    /// Fetch a record by username.
    fn get(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Option<LicenseRecord>, StoreError>> + Send;

    /// Insert a record unless one already exists for its username.
    ///
    /// Fails with [`StoreError::Duplicate`] when the username is taken.
    fn insert_new(
        &self,
        record: LicenseRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Atomically replace `machine_id` with `new` if it currently equals
    /// `expected`.
    fn compare_and_set_machine_id(
        &self,
        username: &str,
        expected: &str,
        new: &str,
    ) -> impl Future<Output = Result<CasOutcome, StoreError>> + Send;

    /// Clear the machine binding.
    fn clear_machine_id(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Overwrite the expiration date.
    fn set_expiration(
        &self,
        username: &str,
        expiration_date: Option<NaiveDate>,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Mark the license inactive.
    fn deactivate(&self, username: &str) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// All records, ordered by username.
    fn list(&self) -> impl Future<Output = Result<Vec<LicenseRecord>, StoreError>> + Send;
}

// -- In-memory arena ----------------------------------------------------------

type Cell = Arc<Mutex<LicenseRecord>>;

/// Thread-safe, cloneable in-memory license store.
///
/// Locks are `parking_lot` (never poisoned) and are never held across an
/// `.await`.
#[derive(Debug, Clone, Default)]
pub struct MemoryLicenseStore {
    records: Arc<RwLock<HashMap<String, Cell>>>,
}

impl MemoryLicenseStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cell(&self, username: &str) -> Option<Cell> {
        self.records.read().get(username).cloned()
    }

    /// Run `f` against one record under its own lock.
    fn with_record<R>(&self, username: &str, f: impl FnOnce(&mut LicenseRecord) -> R) -> Option<R> {
        let cell = self.cell(username)?;
        let mut guard = cell.lock();
        Some(f(&mut guard))
    }
}

impl LicenseStore for MemoryLicenseStore {
    async fn get(&self, username: &str) -> Result<Option<LicenseRecord>, StoreError> {
        Ok(self.with_record(username, |rec| rec.clone()))
    }

    async fn insert_new(&self, record: LicenseRecord) -> Result<(), StoreError> {
        let mut map = self.records.write();
        if map.contains_key(&record.username) {
            return Err(StoreError::Duplicate(record.username));
        }
        map.insert(record.username.clone(), Arc::new(Mutex::new(record)));
        Ok(())
    }

    async fn compare_and_set_machine_id(
        &self,
        username: &str,
        expected: &str,
        new: &str,
    ) -> Result<CasOutcome, StoreError> {
        let outcome = self.with_record(username, |rec| {
            if rec.machine_id == expected {
                rec.machine_id = new.to_string();
                CasOutcome::Applied
            } else {
                CasOutcome::Current(rec.machine_id.clone())
            }
        });
        Ok(outcome.unwrap_or(CasOutcome::Missing))
    }

    async fn clear_machine_id(&self, username: &str) -> Result<bool, StoreError> {
        Ok(self
            .with_record(username, |rec| rec.machine_id.clear())
            .is_some())
    }

    async fn set_expiration(
        &self,
        username: &str,
        expiration_date: Option<NaiveDate>,
    ) -> Result<bool, StoreError> {
        Ok(self
            .with_record(username, |rec| rec.expiration_date = expiration_date)
            .is_some())
    }

    async fn deactivate(&self, username: &str) -> Result<bool, StoreError> {
        Ok(self
            .with_record(username, |rec| rec.active = false)
            .is_some())
    }

    async fn list(&self) -> Result<Vec<LicenseRecord>, StoreError> {
        let cells: Vec<Cell> = self.records.read().values().cloned().collect();
        let mut out: Vec<LicenseRecord> = cells.iter().map(|c| c.lock().clone()).collect();
        out.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(username: &str) -> LicenseRecord {
        LicenseRecord::issue(username, "hash", "K-1", None)
    }

    #[tokio::test]
    async fn insert_and_get() {
        let store = MemoryLicenseStore::new();
        assert!(store.is_empty());
        store.insert_new(record("alice")).await.unwrap();
        assert_eq!(store.len(), 1);

        let got = store.get("alice").await.unwrap().unwrap();
        assert_eq!(got.username, "alice");
        assert!(store.get("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn insert_new_rejects_duplicates() {
        let store = MemoryLicenseStore::new();
        store.insert_new(record("alice")).await.unwrap();
        let err = store.insert_new(record("alice")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(ref u) if u == "alice"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn cas_applies_only_on_expected_value() {
        let store = MemoryLicenseStore::new();
        store.insert_new(record("alice")).await.unwrap();

        let first = store.compare_and_set_machine_id("alice", "", "M1").await.unwrap();
        assert_eq!(first, CasOutcome::Applied);

        let second = store.compare_and_set_machine_id("alice", "", "M2").await.unwrap();
        assert_eq!(second, CasOutcome::Current("M1".into()));

        let rec = store.get("alice").await.unwrap().unwrap();
        assert_eq!(rec.machine_id, "M1");
    }

    #[tokio::test]
    async fn cas_on_missing_record() {
        let store = MemoryLicenseStore::new();
        let out = store.compare_and_set_machine_id("ghost", "", "M1").await.unwrap();
        assert_eq!(out, CasOutcome::Missing);
    }

    #[tokio::test]
    async fn mutators_report_missing_records() {
        let store = MemoryLicenseStore::new();
        assert!(!store.clear_machine_id("ghost").await.unwrap());
        assert!(!store.set_expiration("ghost", None).await.unwrap());
        assert!(!store.deactivate("ghost").await.unwrap());
    }

    #[tokio::test]
    async fn mutators_touch_only_their_field() {
        let store = MemoryLicenseStore::new();
        store.insert_new(record("alice")).await.unwrap();
        store.compare_and_set_machine_id("alice", "", "M1").await.unwrap();

        let date = NaiveDate::from_ymd_opt(2030, 5, 1).unwrap();
        assert!(store.set_expiration("alice", Some(date)).await.unwrap());
        assert!(store.deactivate("alice").await.unwrap());

        let rec = store.get("alice").await.unwrap().unwrap();
        assert_eq!(rec.expiration_date, Some(date));
        assert!(!rec.active);
        assert_eq!(rec.machine_id, "M1");

        assert!(store.clear_machine_id("alice").await.unwrap());
        let rec = store.get("alice").await.unwrap().unwrap();
        assert_eq!(rec.machine_id, "");
        assert!(!rec.active);
        assert_eq!(rec.expiration_date, Some(date));
    }

    #[tokio::test]
    async fn list_is_sorted_by_username() {
        let store = MemoryLicenseStore::new();
        for name in ["carol", "alice", "bob"] {
            store.insert_new(record(name)).await.unwrap();
        }
        let names: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.username)
            .collect();
        assert_eq!(names, vec!["alice", "bob", "carol"]);
    }

    #[tokio::test]
    async fn clones_share_records() {
        let store = MemoryLicenseStore::new();
        let clone = store.clone();
        clone.insert_new(record("alice")).await.unwrap();
        assert!(store.get("alice").await.unwrap().is_some());
    }
}
