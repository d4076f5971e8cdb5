use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use account_registry::http::{self, AppState};
use account_registry::metrics::Metrics;
use account_registry::{db, ConfigResolver, ConfigSource, PasswordHasher, RegistrationService};

const CONFIG_ENV: &str = "ACCOUNT_REGISTRY_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/database.json";

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with environment-based filtering
    // Default to INFO level, can be overridden with RUST_LOG env var
    // Example: RUST_LOG=debug cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,account_registry=debug"))
        )
        .init();

    tracing::info!("🚀 Starting account registry");

    // === 1. Resolve configuration ===
    let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    tracing::info!(path = %path, "Loading configuration");
    let config = ConfigResolver::resolve(ConfigSource::path(&path))
        .with_context(|| format!("failed to load configuration from {}", path))?;

    // === 2. Connect to the account store (fails fast, no retry) ===
    let store = db::connect(&config.database, &config.pool)
        .await
        .context("failed to connect to account store")?;

    // === 3. Metrics ===
    let metrics = Arc::new(Metrics::new()?);
    tracing::info!(
        "📊 Metrics initialized ({} families registered)",
        metrics.registry().gather().len()
    );

    // === 4. Registration service, wired by hand ===
    let hasher = PasswordHasher::new(&config.hashing)?;
    let registration = Arc::new(
        RegistrationService::new(store.account_store(), hasher, config.registration.clone())
            .with_metrics(metrics.clone()),
    );

    // === 5. Serve until shutdown, then release the pool ===
    let served = http::serve(AppState { registration, metrics }, &config.server).await;
    store.close().await;
    served.context("HTTP server failed")?;

    tracing::info!("👋 Shutdown complete");
    Ok(())
}
