//! # Postgres License Store
//!
//! Exercises [`PgLicenseStore`] against a live database. Skipped unless
//! `LICD_TEST_DATABASE_URL` points at a disposable Postgres instance:
//!
//! ```text
//! LICD_TEST_DATABASE_URL=postgres://... cargo test -p licd-api --test pg_store
//! ```
//!
//! Each test works on usernames with a per-run prefix and deletes them
//! afterwards, so runs against a shared database do not collide.

use std::sync::Arc;

use chrono::NaiveDate;
use licd_api::db::licenses::PgLicenseStore;
use licd_registry::{CasOutcome, LicenseRecord, LicenseStore, StoreError};
use sqlx::PgPool;

async fn test_pool() -> Option<PgPool> {
    let Ok(url) = std::env::var("LICD_TEST_DATABASE_URL") else {
        eprintln!("LICD_TEST_DATABASE_URL not set; skipping Postgres store test");
        return None;
    };
    licd_api::db::init_pool(Some(&url)).await.unwrap()
}

fn unique(name: &str) -> String {
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("pgtest-{}-{nanos}-{name}", std::process::id())
}

fn record(username: &str) -> LicenseRecord {
    LicenseRecord::issue(username, "$argon2id$fake", "K-1", None)
}

async fn cleanup(pool: &PgPool, prefix: &str) {
    sqlx::query("DELETE FROM licenses WHERE username LIKE $1")
        .bind(format!("{prefix}%"))
        .execute(pool)
        .await
        .unwrap();
}

#[tokio::test]
async fn insert_get_and_duplicate() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let store = PgLicenseStore::new(pool.clone());
    let user = unique("insert");

    store.insert_new(record(&user)).await.unwrap();
    let fetched = store.get(&user).await.unwrap().unwrap();
    assert_eq!(fetched, record(&user));

    let err = store.insert_new(record(&user)).await.unwrap_err();
    assert!(matches!(err, StoreError::Duplicate(u) if u == user));
    assert!(store.get("pgtest-nobody").await.unwrap().is_none());

    cleanup(&pool, &user).await;
}

#[tokio::test]
async fn machine_binding_compare_and_set() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let store = PgLicenseStore::new(pool.clone());
    let user = unique("cas");
    store.insert_new(record(&user)).await.unwrap();

    assert_eq!(
        store.compare_and_set_machine_id(&user, "", "M1").await.unwrap(),
        CasOutcome::Applied
    );
    assert_eq!(
        store.compare_and_set_machine_id(&user, "", "M2").await.unwrap(),
        CasOutcome::Current("M1".into())
    );
    assert_eq!(
        store
            .compare_and_set_machine_id("pgtest-nobody", "", "M1")
            .await
            .unwrap(),
        CasOutcome::Missing
    );

    assert!(store.clear_machine_id(&user).await.unwrap());
    assert_eq!(store.get(&user).await.unwrap().unwrap().machine_id, "");

    cleanup(&pool, &user).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_binding_has_one_winner() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let store = Arc::new(PgLicenseStore::new(pool.clone()));
    let user = unique("race");
    store.insert_new(record(&user)).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = Arc::clone(&store);
        let user = user.clone();
        handles.push(tokio::spawn(async move {
            store
                .compare_and_set_machine_id(&user, "", &format!("M{i}"))
                .await
                .unwrap()
        }));
    }

    let mut applied = 0;
    for handle in handles {
        if handle.await.unwrap() == CasOutcome::Applied {
            applied += 1;
        }
    }
    assert_eq!(applied, 1);

    cleanup(&pool, &user).await;
}

#[tokio::test]
async fn mutators_and_listing() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let store = PgLicenseStore::new(pool.clone());
    let prefix = unique("list");
    let (a, b) = (format!("{prefix}-a"), format!("{prefix}-b"));
    store.insert_new(record(&b)).await.unwrap();
    store.insert_new(record(&a)).await.unwrap();

    let date = NaiveDate::from_ymd_opt(2027, 1, 31).unwrap();
    assert!(store.set_expiration(&a, Some(date)).await.unwrap());
    assert!(store.deactivate(&b).await.unwrap());
    assert!(!store.deactivate("pgtest-nobody").await.unwrap());
    assert!(!store.set_expiration("pgtest-nobody", None).await.unwrap());

    let listed: Vec<LicenseRecord> = store
        .list()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.username.starts_with(&prefix))
        .collect();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].username, a);
    assert_eq!(listed[0].expiration_date, Some(date));
    assert!(listed[0].active);
    assert_eq!(listed[1].username, b);
    assert!(!listed[1].active);

    cleanup(&pool, &prefix).await;
}
