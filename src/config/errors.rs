use std::path::PathBuf;

// ============================================================================
// Configuration Errors
// ============================================================================

/// Raised while resolving the configuration document. Every variant is fatal
/// to startup; the process entry point decides how to abort.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration from {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed configuration document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unsupported engine kind: {0:?}")]
    UnsupportedEngine(String),

    #[error("missing required field `{0}`")]
    MissingField(String),

    #[error("invalid value for `{field}`: {reason}")]
    InvalidField { field: String, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
