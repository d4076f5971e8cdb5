use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{EmailCase, RegistrationPolicy};
use super::errors::ValidationError;

// ============================================================================
// Account Value Objects
// ============================================================================

/// Store-assigned account identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub i64);

impl AccountId {
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Account email address
///
/// `Email::parse` is the only way request input becomes an `Email`; it
/// applies the configured case policy, so two inputs that should collide
/// produce identical values. `Email::new` wraps a value already read back
/// from the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    pub fn new(email: impl Into<String>) -> Self {
        Self(email.into())
    }

    pub fn parse(raw: &str, policy: &RegistrationPolicy) -> Result<Self, ValidationError> {
        // Checks run on the stored form: lowercasing can lengthen some
        // characters ('İ' becomes two chars).
        let email = match policy.email_case {
            EmailCase::Sensitive => raw.to_string(),
            EmailCase::Insensitive => raw.to_lowercase(),
        };

        if email.is_empty() {
            return Err(ValidationError::EmptyEmail);
        }
        if email.chars().count() > policy.max_email_length {
            return Err(ValidationError::EmailTooLong {
                max: policy.max_email_length,
            });
        }
        if email.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(ValidationError::InvalidEmail("contains whitespace or control characters"));
        }

        let (local, domain) = email
            .split_once('@')
            .ok_or(ValidationError::InvalidEmail("missing '@'"))?;

        if local.is_empty() {
            return Err(ValidationError::InvalidEmail("missing local part"));
        }
        if domain.contains('@') {
            return Err(ValidationError::InvalidEmail("more than one '@'"));
        }
        if !domain.contains('.')
            || domain.starts_with('.')
            || domain.ends_with('.')
            || domain.contains("..")
        {
            return Err(ValidationError::InvalidEmail("malformed domain"));
        }

        Ok(Self(email))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encoded one-way password hash (PHC string with embedded salt and
/// parameters). Never serialized and never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct HashedSecret(String);

impl HashedSecret {
    pub fn from_encoded(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for HashedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HashedSecret(***)")
    }
}

/// Check a plaintext password against the length policy.
pub fn validate_password(
    password: &str,
    policy: &RegistrationPolicy,
) -> Result<(), ValidationError> {
    let length = password.chars().count();

    if length == 0 {
        return Err(ValidationError::EmptyPassword);
    }
    if length < policy.min_password_length {
        return Err(ValidationError::PasswordTooShort {
            min: policy.min_password_length,
        });
    }
    if length > policy.max_password_length {
        return Err(ValidationError::PasswordTooLong {
            max: policy.max_password_length,
        });
    }
    Ok(())
}

/// Persisted identity record. Created once, never mutated here.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: AccountId,
    pub email: Email,
    pub password_hash: HashedSecret,
    pub created_at: DateTime<Utc>,
}

/// Outward-facing result of a registration; carries no secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub id: AccountId,
    pub email: Email,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
