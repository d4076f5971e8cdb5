// ============================================================================
// Configuration - Resolved, Immutable Process Configuration
// ============================================================================
//
// The configuration document is parsed once at startup by `ConfigResolver`
// and handed to the store connector, the password hasher and the
// registration service. Nothing in here is mutated after resolution.
//
// ============================================================================

mod errors;
mod resolver;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use errors::ConfigError;
pub use resolver::{ConfigResolver, ConfigSource};

/// Supported relational engines. Selected once when the store is connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Postgres,
    MySql,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Postgres => "postgres",
            EngineKind::MySql => "mysql",
        }
    }

    /// TLS modes understood by the engine's driver.
    pub fn ssl_modes(&self) -> &'static [&'static str] {
        match self {
            EngineKind::Postgres => &[
                "disable",
                "allow",
                "prefer",
                "require",
                "verify-ca",
                "verify-full",
            ],
            EngineKind::MySql => &[
                "disabled",
                "preferred",
                "required",
                "verify_ca",
                "verify_identity",
            ],
        }
    }

    pub fn default_ssl_mode(&self) -> &'static str {
        match self {
            EngineKind::Postgres => "prefer",
            EngineKind::MySql => "preferred",
        }
    }
}

impl FromStr for EngineKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(EngineKind::Postgres),
            "mysql" | "mariadb" => Ok(EngineKind::MySql),
            _ => Err(ConfigError::UnsupportedEngine(s.to_string())),
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection parameters, complete and valid for the engine they were
/// resolved against.
#[derive(Clone, PartialEq)]
pub struct ConnectionParameters {
    pub host: String,
    pub user: String,
    pub password: String,
    pub database_name: String,
    pub port: u16,
    pub ssl_mode: String,
}

impl fmt::Debug for ConnectionParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParameters")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database_name", &self.database_name)
            .field("port", &self.port)
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    pub engine: EngineKind,
    pub connection: ConnectionParameters,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 0,
            acquire_timeout: Duration::from_millis(5_000),
        }
    }
}

/// Whether `A@x.com` and `a@x.com` name the same account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmailCase {
    /// Emails are stored and compared byte-for-byte.
    #[default]
    Sensitive,
    /// Emails are lowercased before lookup and insert.
    Insensitive,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationPolicy {
    pub email_case: EmailCase,
    pub min_password_length: usize,
    pub max_password_length: usize,
    pub max_email_length: usize,
    /// Upper bound on the insert round-trip. On expiry the outcome is unknown.
    pub persist_timeout: Duration,
}

impl Default for RegistrationPolicy {
    fn default() -> Self {
        Self {
            email_case: EmailCase::Sensitive,
            min_password_length: 1,
            max_password_length: 1024,
            max_email_length: 320,
            persist_timeout: Duration::from_millis(5_000),
        }
    }
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HashingConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

impl HashingConfig {
    pub fn params(&self) -> Result<argon2::Params, ConfigError> {
        argon2::Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| ConfigError::invalid("hashing", e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub database: DatabaseConfig,
    pub pool: PoolConfig,
    pub registration: RegistrationPolicy,
    pub hashing: HashingConfig,
    pub server: ServerConfig,
}

// ============================================================================
// Unit Tests
// ============================================================================
