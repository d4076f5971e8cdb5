use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ============================================================================
// Account Errors
// ============================================================================

/// Malformed request input. No state change.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Email cannot be empty")]
    EmptyEmail,

    #[error("Email exceeds {max} characters")]
    EmailTooLong { max: usize },

    #[error("Invalid email format: {0}")]
    InvalidEmail(&'static str),

    #[error("Password cannot be empty")]
    EmptyPassword,

    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("Password must be at most {max} characters")]
    PasswordTooLong { max: usize },
}

/// Hashing subsystem failure. Never caused by the shape of the input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HashError {
    #[error("Entropy source unavailable: {0}")]
    Entropy(String),

    #[error("Password hashing failed: {0}")]
    Algorithm(String),

    #[error("Password hashing task aborted: {0}")]
    Aborted(String),
}

/// Failure reported by an `AccountStore`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The store's unique constraint on `email` rejected the insert.
    #[error("Email already registered")]
    DuplicateEmail,

    /// Pool exhausted or closed, connection lost.
    #[error("Account store unavailable: {0}")]
    Unavailable(String),

    #[error("Account store query failed: {0}")]
    Query(String),
}

/// Error kinds surfaced to the transport boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    ValidationError,
    DuplicateEmail,
    HashError,
    ConnectionError,
    Timeout,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "ValidationError",
            ErrorKind::DuplicateEmail => "DuplicateEmail",
            ErrorKind::HashError => "HashError",
            ErrorKind::ConnectionError => "ConnectionError",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::Unknown => "Unknown",
        }
    }

    /// Whether the failure is attributable to the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ErrorKind::ValidationError | ErrorKind::DuplicateEmail)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("The email address provided has already been registered: {0}")]
    DuplicateEmail(String),

    #[error(transparent)]
    Hash(#[from] HashError),

    #[error("Account store unavailable: {0}")]
    Connection(String),

    /// The insert may or may not have committed. Re-check before retrying.
    #[error(
        "Persisting the account timed out after {}ms; it may or may not have been created",
        .0.as_millis()
    )]
    Timeout(Duration),

    #[error("Unexpected store failure: {0}")]
    Unknown(String),
}

impl RegistrationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistrationError::Validation(_) => ErrorKind::ValidationError,
            RegistrationError::DuplicateEmail(_) => ErrorKind::DuplicateEmail,
            RegistrationError::Hash(_) => ErrorKind::HashError,
            RegistrationError::Connection(_) => ErrorKind::ConnectionError,
            RegistrationError::Timeout(_) => ErrorKind::Timeout,
            RegistrationError::Unknown(_) => ErrorKind::Unknown,
        }
    }

    pub fn detail(&self) -> String {
        self.to_string()
    }

    /// Translate a store failure for `email`. A constraint violation is the
    /// authoritative duplicate signal regardless of any earlier lookup.
    pub fn from_store(err: StoreError, email: &str) -> Self {
        match err {
            StoreError::DuplicateEmail => RegistrationError::DuplicateEmail(email.to_string()),
            StoreError::Unavailable(msg) => RegistrationError::Connection(msg),
            StoreError::Query(msg) => RegistrationError::Unknown(msg),
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_cover_every_variant() {
        let cases = vec![
            (
                RegistrationError::Validation(ValidationError::EmptyEmail),
                ErrorKind::ValidationError,
            ),
            (RegistrationError::DuplicateEmail("a@x.com".into()), ErrorKind::DuplicateEmail),
            (RegistrationError::Hash(HashError::Entropy("gone".into())), ErrorKind::HashError),
            (RegistrationError::Connection("pool closed".into()), ErrorKind::ConnectionError),
            (RegistrationError::Timeout(Duration::from_millis(10)), ErrorKind::Timeout),
            (RegistrationError::Unknown("boom".into()), ErrorKind::Unknown),
        ];

        for (err, kind) in cases {
            assert_eq!(err.kind(), kind);
            assert!(!err.detail().is_empty());
        }
    }

    #[test]
    fn test_client_error_classification() {
        assert!(ErrorKind::ValidationError.is_client_error());
        assert!(ErrorKind::DuplicateEmail.is_client_error());
        assert!(!ErrorKind::HashError.is_client_error());
        assert!(!ErrorKind::ConnectionError.is_client_error());
        assert!(!ErrorKind::Timeout.is_client_error());
        assert!(!ErrorKind::Unknown.is_client_error());
    }

    #[test]
    fn test_store_error_translation() {
        assert!(matches!(
            RegistrationError::from_store(StoreError::DuplicateEmail, "a@x.com"),
            RegistrationError::DuplicateEmail(ref e) if e == "a@x.com"
        ));
        assert_eq!(
            RegistrationError::from_store(StoreError::Unavailable("x".into()), "a@x.com").kind(),
            ErrorKind::ConnectionError
        );
        assert_eq!(
            RegistrationError::from_store(StoreError::Query("x".into()), "a@x.com").kind(),
            ErrorKind::Unknown
        );
    }

    #[test]
    fn test_timeout_detail_warns_outcome_unknown() {
        let detail = RegistrationError::Timeout(Duration::from_millis(250)).detail();
        assert!(detail.contains("250ms"));
        assert!(detail.contains("may or may not"));
    }

    #[test]
    fn test_error_kind_serializes_as_name() {
        assert_eq!(
            serde_json::to_string(&ErrorKind::DuplicateEmail).unwrap(),
            "\"DuplicateEmail\""
        );
    }
}
