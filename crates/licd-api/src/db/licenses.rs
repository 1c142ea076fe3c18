//! License persistence on the `licenses` table.
//!
//! [`PgLicenseStore`] implements [`LicenseStore`] over a `PgPool`. Every
//! operation is one statement except the machine binding, which takes a row
//! lock (`SELECT ... FOR UPDATE`) and updates inside the same transaction so
//! that concurrent first-use verifications serialize on the row.

use chrono::NaiveDate;
use licd_registry::{CasOutcome, LicenseRecord, LicenseStore, StoreError};
use sqlx::PgPool;

/// Postgres-backed license store. Cheap to clone (the pool is shared).
#[derive(Debug, Clone)]
pub struct PgLicenseStore {
    pool: PgPool,
}

impl PgLicenseStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Round-trip to the database.
    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

const UNIQUE_VIOLATION: &str = "23505";

impl LicenseStore for PgLicenseStore {
    async fn get(&self, username: &str) -> Result<Option<LicenseRecord>, StoreError> {
        let row = sqlx::query_as::<_, LicenseRow>(
            "SELECT username, password_hash, license_key, expiration_date, machine_id, active
             FROM licenses WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        Ok(row.map(LicenseRow::into_record))
    }

    async fn insert_new(&self, record: LicenseRecord) -> Result<(), StoreError> {
        let result = sqlx::query(
            "INSERT INTO licenses (username, password_hash, license_key, expiration_date,
             machine_id, active)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (username) DO NOTHING",
        )
        .bind(&record.username)
        .bind(&record.password_hash)
        .bind(&record.license_key)
        .bind(record.expiration_date)
        .bind(&record.machine_id)
        .bind(record.active)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => Err(StoreError::Duplicate(record.username)),
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                Err(StoreError::Duplicate(record.username))
            }
            Err(e) => Err(backend(e)),
        }
    }

    async fn compare_and_set_machine_id(
        &self,
        username: &str,
        expected: &str,
        new: &str,
    ) -> Result<CasOutcome, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let current: Option<String> = sqlx::query_scalar::<_, String>(
            "SELECT machine_id FROM licenses WHERE username = $1 FOR UPDATE",
        )
        .bind(username)
        .fetch_optional(&mut *tx)
        .await
        .map_err(backend)?;

        let outcome = match current {
            None => CasOutcome::Missing,
            Some(current) if current != expected => CasOutcome::Current(current),
            Some(_) => {
                sqlx::query("UPDATE licenses SET machine_id = $2 WHERE username = $1")
                    .bind(username)
                    .bind(new)
                    .execute(&mut *tx)
                    .await
                    .map_err(backend)?;
                CasOutcome::Applied
            }
        };

        tx.commit().await.map_err(backend)?;
        Ok(outcome)
    }

    async fn clear_machine_id(&self, username: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE licenses SET machine_id = '' WHERE username = $1")
            .bind(username)
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_expiration(
        &self,
        username: &str,
        expiration_date: Option<NaiveDate>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE licenses SET expiration_date = $2 WHERE username = $1")
            .bind(username)
            .bind(expiration_date)
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        Ok(result.rows_affected() > 0)
    }

    async fn deactivate(&self, username: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE licenses SET active = FALSE WHERE username = $1")
            .bind(username)
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> Result<Vec<LicenseRecord>, StoreError> {
        let rows = sqlx::query_as::<_, LicenseRow>(
            "SELECT username, password_hash, license_key, expiration_date, machine_id, active
             FROM licenses ORDER BY username",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        Ok(rows.into_iter().map(LicenseRow::into_record).collect())
    }
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct LicenseRow {
    username: String,
    password_hash: String,
    license_key: String,
    expiration_date: Option<NaiveDate>,
    machine_id: String,
    active: bool,
}

impl LicenseRow {
    fn into_record(self) -> LicenseRecord {
        LicenseRecord {
            username: self.username,
            password_hash: self.password_hash,
            license_key: self.license_key,
            expiration_date: self.expiration_date,
            machine_id: self.machine_id,
            active: self.active,
        }
    }
}
