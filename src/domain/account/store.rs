use async_trait::async_trait;

use super::errors::StoreError;
use super::value_objects::{Account, Email, HashedSecret};

// ============================================================================
// Account Store - Capability over the relational store
// ============================================================================
//
// Implementations: crate::db::{PostgresAccountStore, MySqlAccountStore,
// MemoryAccountStore}.
//
// Uniqueness of `email` is enforced by the store itself (a unique
// constraint, or an equivalent atomic check-and-insert). Callers never
// hold an in-process lock around find + insert.
//
// ============================================================================

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Short engine name for logs and metrics.
    fn engine(&self) -> &'static str;

    /// Exact-match lookup. Advisory only; never relied upon for uniqueness.
    async fn find_by_email(&self, email: &Email) -> Result<Option<Account>, StoreError>;

    /// Always issues the insert. Fails with `StoreError::DuplicateEmail`
    /// when the store's uniqueness enforcement rejects it, no matter what
    /// an earlier `find_by_email` returned.
    async fn insert_if_absent(
        &self,
        email: &Email,
        password_hash: &HashedSecret,
    ) -> Result<Account, StoreError>;
}
