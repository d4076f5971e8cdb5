use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::domain::account::{Account, AccountId, AccountStore, Email, HashedSecret, StoreError};

// ============================================================================
// In-memory Account Store
// ============================================================================
//
// No unique index to lean on here, so the check and the insert happen under
// one lock: the equivalent of the database's atomic constraint check.
// Used by tests and for running the service without a database.
//
// ============================================================================

#[derive(Default)]
pub struct MemoryAccountStore {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    last_id: i64,
    accounts: HashMap<Email, Account>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.accounts.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Rows stored under exactly this email (0 or 1).
    pub async fn count_by_email(&self, email: &Email) -> usize {
        let state = self.state.lock().await;
        state.accounts.values().filter(|a| &a.email == email).count()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    fn engine(&self) -> &'static str {
        "memory"
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<Account>, StoreError> {
        Ok(self.state.lock().await.accounts.get(email).cloned())
    }

    async fn insert_if_absent(
        &self,
        email: &Email,
        password_hash: &HashedSecret,
    ) -> Result<Account, StoreError> {
        let mut state = self.state.lock().await;

        if state.accounts.contains_key(email) {
            return Err(StoreError::DuplicateEmail);
        }

        state.last_id += 1;
        let account = Account {
            id: AccountId(state.last_id),
            email: email.clone(),
            password_hash: password_hash.clone(),
            created_at: Utc::now(),
        };
        state.accounts.insert(email.clone(), account.clone());

        Ok(account)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_then_find() {
        let store = MemoryAccountStore::new();
        let email = Email::new("a@x.com");

        assert!(store.is_empty().await);
        assert!(store.find_by_email(&email).await.unwrap().is_none());

        let account = store
            .insert_if_absent(&email, &HashedSecret::from_encoded("h"))
            .await
            .unwrap();
        assert_eq!(account.id, AccountId(1));
        assert!(!store.is_empty().await);

        let found = store.find_by_email(&email).await.unwrap().unwrap();
        assert_eq!(found, account);
    }

    #[tokio::test]
    async fn test_second_insert_is_duplicate() {
        let store = MemoryAccountStore::new();
        let email = Email::new("a@x.com");

        store.insert_if_absent(&email, &HashedSecret::from_encoded("h1")).await.unwrap();
        let err = store
            .insert_if_absent(&email, &HashedSecret::from_encoded("h2"))
            .await
            .unwrap_err();

        assert_eq!(err, StoreError::DuplicateEmail);
        assert_eq!(store.count_by_email(&email).await, 1);
        // The first hash is untouched.
        let kept = store.find_by_email(&email).await.unwrap().unwrap();
        assert_eq!(kept.password_hash.as_str(), "h1");
    }

    #[tokio::test]
    async fn test_lookup_is_exact_match() {
        let store = MemoryAccountStore::new();
        store
            .insert_if_absent(&Email::new("A@x.com"), &HashedSecret::from_encoded("h"))
            .await
            .unwrap();

        assert!(store.find_by_email(&Email::new("a@x.com")).await.unwrap().is_none());
        assert!(store.find_by_email(&Email::new("A@x.com")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_ids_are_monotonic_and_nonzero() {
        let store = MemoryAccountStore::new();
        let hash = HashedSecret::from_encoded("h");
        let a = store.insert_if_absent(&Email::new("a@x.com"), &hash).await.unwrap();
        let b = store.insert_if_absent(&Email::new("b@x.com"), &hash).await.unwrap();

        assert!(a.id.value() > 0);
        assert!(b.id > a.id);
        assert_eq!(store.len().await, 2);
    }
}
