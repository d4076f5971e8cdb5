// ============================================================================
// Account Domain - Registration Transaction
// ============================================================================
//
// This module contains ALL Account-specific code:
// - Value objects (Email, AccountId, HashedSecret, Account)
// - Errors (ValidationError, HashError, StoreError, RegistrationError)
// - Store capability (AccountStore trait, implemented in crate::db)
// - Password hasher (Argon2id)
// - Registration service (validate -> pre-check -> hash -> persist)
//
// ============================================================================

pub mod value_objects;
pub mod errors;
pub mod store;
pub mod hasher;
pub mod registration;

// Re-export for convenience
pub use value_objects::*;
pub use errors::*;
pub use store::AccountStore;
pub use hasher::PasswordHasher;
pub use registration::{RegistrationService, RegistrationStage};
