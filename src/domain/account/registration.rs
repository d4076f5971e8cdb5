use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::Instrument;
use uuid::Uuid;

use crate::config::RegistrationPolicy;
use crate::metrics::Metrics;

use super::errors::{RegistrationError, StoreError};
use super::hasher::PasswordHasher;
use super::store::AccountStore;
use super::value_objects::{validate_password, AccountSummary, Email};

// ============================================================================
// Registration Service
// ============================================================================
//
// Orchestrates one request:
//   Received -> Validated -> UniquenessChecked -> Hashed -> Persisted -> Completed
// with a typed rejection out of every stage.
//
// The pre-check only spares the hashing cost in the common case. The unique
// constraint hit during persist is what actually guarantees one account per
// email when requests race.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStage {
    Received,
    Validated,
    UniquenessChecked,
    Hashed,
    Persisted,
    Completed,
}

impl RegistrationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStage::Received => "received",
            RegistrationStage::Validated => "validated",
            RegistrationStage::UniquenessChecked => "uniqueness_checked",
            RegistrationStage::Hashed => "hashed",
            RegistrationStage::Persisted => "persisted",
            RegistrationStage::Completed => "completed",
        }
    }
}

impl fmt::Display for RegistrationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct RegistrationService {
    store: Arc<dyn AccountStore>,
    hasher: PasswordHasher,
    policy: RegistrationPolicy,
    metrics: Option<Arc<Metrics>>,
}

impl RegistrationService {
    pub fn new(
        store: Arc<dyn AccountStore>,
        hasher: PasswordHasher,
        policy: RegistrationPolicy,
    ) -> Self {
        Self {
            store,
            hasher,
            policy,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Register a new account. The returned summary never carries the hash.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AccountSummary, RegistrationError> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("register", %request_id, engine = self.store.engine());
        let started = Instant::now();

        let result = self.run(email, password).instrument(span).await;

        if let Some(metrics) = &self.metrics {
            let outcome = match &result {
                Ok(_) => "success",
                Err(e) => e.kind().as_str(),
            };
            metrics.record_registration(outcome, started.elapsed().as_secs_f64());
        }

        result
    }

    async fn run(&self, email: &str, password: &str) -> Result<AccountSummary, RegistrationError> {
        // Received -> Validated
        let email = Email::parse(email, &self.policy)
            .and_then(|email| validate_password(password, &self.policy).map(|_| email))
            .map_err(|e| reject(RegistrationStage::Received, e.into()))?;

        // Validated -> UniquenessChecked (advisory)
        match self.store.find_by_email(&email).await {
            Ok(None) => {}
            Ok(Some(existing)) => {
                tracing::debug!(account_id = %existing.id, "Pre-check found existing account");
                return Err(reject(
                    RegistrationStage::Validated,
                    RegistrationError::DuplicateEmail(email.to_string()),
                ));
            }
            Err(e) => {
                return Err(reject(
                    RegistrationStage::Validated,
                    RegistrationError::from_store(e, email.as_str()),
                ));
            }
        }

        // UniquenessChecked -> Hashed
        let hash_started = Instant::now();
        let password_hash = self
            .hasher
            .hash_blocking(password.to_string())
            .await
            .map_err(|e| reject(RegistrationStage::UniquenessChecked, e.into()))?;
        if let Some(metrics) = &self.metrics {
            metrics.record_password_hash(hash_started.elapsed().as_secs_f64());
        }

        // Hashed -> Persisted (authoritative uniqueness)
        let insert = self.store.insert_if_absent(&email, &password_hash);
        let account = match tokio::time::timeout(self.policy.persist_timeout, insert).await {
            Ok(Ok(account)) => account,
            Ok(Err(StoreError::DuplicateEmail)) => {
                tracing::info!("Unique constraint rejected insert after pre-check passed");
                return Err(reject(
                    RegistrationStage::Hashed,
                    RegistrationError::DuplicateEmail(email.to_string()),
                ));
            }
            Ok(Err(e)) => {
                return Err(reject(
                    RegistrationStage::Hashed,
                    RegistrationError::from_store(e, email.as_str()),
                ));
            }
            Err(_) => {
                return Err(reject(
                    RegistrationStage::Hashed,
                    RegistrationError::Timeout(self.policy.persist_timeout),
                ));
            }
        };

        tracing::debug!(
            account_id = %account.id,
            stage = %RegistrationStage::Persisted,
            "Account row persisted"
        );

        // Persisted -> Completed
        tracing::info!(
            account_id = %account.id,
            stage = %RegistrationStage::Completed,
            "✅ Account registered"
        );

        Ok(AccountSummary::from(&account))
    }
}

/// Log a rejection at the stage it left from and hand the error back.
fn reject(stage: RegistrationStage, err: RegistrationError) -> RegistrationError {
    let kind = err.kind();
    if kind.is_client_error() {
        tracing::info!(stage = %stage, kind = %kind, detail = %err, "Registration rejected");
    } else {
        tracing::error!(stage = %stage, kind = %kind, detail = %err, "Registration failed");
    }
    err
}

// ============================================================================
// Unit Tests
// ============================================================================
