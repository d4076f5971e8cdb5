//! Runs against a real database only when `ACCOUNT_REGISTRY_TEST_CONFIG`
//! points at a configuration document for a disposable PostgreSQL or MySQL
//! instance. Without it every test returns early.

use std::sync::Arc;

use futures_util::future::join_all;

use account_registry::config::{Configuration, HashingConfig};
use account_registry::domain::account::{AccountStore, Email, ErrorKind};
use account_registry::{
    db, ConfigResolver, ConfigSource, PasswordHasher, RegistrationService, StoreHandle,
};

const TEST_CONFIG_ENV: &str = "ACCOUNT_REGISTRY_TEST_CONFIG";

fn test_configuration() -> Option<Configuration> {
    let path = std::env::var(TEST_CONFIG_ENV).ok()?;
    Some(ConfigResolver::resolve(ConfigSource::path(path)).unwrap())
}

async fn service(handle: &StoreHandle, config: &Configuration) -> Arc<RegistrationService> {
    let hasher = PasswordHasher::new(&HashingConfig {
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    })
    .unwrap();

    Arc::new(RegistrationService::new(
        handle.account_store(),
        hasher,
        config.registration.clone(),
    ))
}

fn unique_email(tag: &str) -> String {
    format!("{}-{}@it.example.com", tag, uuid::Uuid::new_v4().simple())
}

#[tokio::test]
async fn test_schema_bootstrap_is_idempotent() {
    let Some(config) = test_configuration() else { return };

    let handle = db::connect(&config.database, &config.pool).await.unwrap();
    handle.ensure_schema().await.unwrap();
    handle.ensure_schema().await.unwrap();
    assert_eq!(handle.engine(), config.database.engine);

    handle.close().await;
}

#[tokio::test]
async fn test_register_then_duplicate() {
    let Some(config) = test_configuration() else { return };

    let handle = db::connect(&config.database, &config.pool).await.unwrap();
    let service = service(&handle, &config).await;
    let email = unique_email("dup");

    let created = service.register(&email, "secret1").await.unwrap();
    assert!(created.id.value() > 0);
    assert_eq!(created.email.as_str(), email);

    let err = service.register(&email, "other").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateEmail);

    let stored = handle
        .account_store()
        .find_by_email(&Email::new(email.as_str()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.id, created.id);
    assert!(stored.password_hash.as_str().starts_with("$argon2id$"));

    handle.close().await;
}

#[tokio::test]
async fn test_concurrent_registrations_create_one_row() {
    let Some(config) = test_configuration() else { return };

    let handle = db::connect(&config.database, &config.pool).await.unwrap();
    let service = service(&handle, &config).await;
    let email = unique_email("race");

    let attempts = join_all((0..8).map(|i| {
        let service = service.clone();
        let email = email.clone();
        async move { service.register(&email, &format!("secret{}", i)).await }
    }))
    .await;

    let winners = attempts.iter().filter(|r| r.is_ok()).count();
    let duplicates = attempts
        .iter()
        .filter(|r| matches!(r, Err(e) if e.kind() == ErrorKind::DuplicateEmail))
        .count();
    assert_eq!(winners, 1);
    assert_eq!(duplicates, 7);

    handle.close().await;
}

#[tokio::test]
async fn test_distinct_emails_get_distinct_ids() {
    let Some(config) = test_configuration() else { return };

    let handle = db::connect(&config.database, &config.pool).await.unwrap();
    let service = service(&handle, &config).await;

    let a = service.register(&unique_email("a"), "secret1").await.unwrap();
    let b = service.register(&unique_email("b"), "secret1").await.unwrap();
    assert_ne!(a.id, b.id);

    handle.close().await;
}
