use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use super::{
    ConfigError, Configuration, ConnectionParameters, DatabaseConfig, EmailCase, EngineKind,
    HashingConfig, PoolConfig, RegistrationPolicy, ServerConfig,
};

// ============================================================================
// Config Resolver - JSON document -> validated Configuration
// ============================================================================
//
// Two document layouts are accepted:
//
//   { "engineKind": "postgres", "connection": { "host": ..., "port": 5432, ... } }
//
//   { "database_type": "mysql", "postgres": { ... }, "mysql": { ... } }
//
// In the second layout the section named after the engine supplies the
// connection. An explicit `connection` object always wins.
//
// ============================================================================

/// Where the configuration document comes from.
#[derive(Debug, Clone)]
pub enum ConfigSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl ConfigSource {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    pub fn inline(document: impl Into<String>) -> Self {
        Self::Bytes(document.into().into_bytes())
    }
}

pub struct ConfigResolver;

impl ConfigResolver {
    /// Parse and validate a configuration document. No side effects beyond
    /// reading `source`.
    pub fn resolve(source: ConfigSource) -> Result<Configuration, ConfigError> {
        let bytes = match source {
            ConfigSource::Path(path) => {
                std::fs::read(&path).map_err(|source| ConfigError::Io { path, source })?
            }
            ConfigSource::Bytes(bytes) => bytes,
        };

        let document: RawDocument = serde_json::from_slice(&bytes)?;
        document.validate()
    }

    pub fn resolve_str(document: &str) -> Result<Configuration, ConfigError> {
        Self::resolve(ConfigSource::inline(document))
    }
}

// ============================================================================
// Raw document shape
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDocument {
    #[serde(alias = "database_type", alias = "db_type")]
    engine_kind: Option<String>,
    connection: Option<RawConnection>,
    postgres: Option<RawConnection>,
    mysql: Option<RawConnection>,
    #[serde(default)]
    pool: RawPool,
    #[serde(default)]
    registration: RawRegistration,
    #[serde(default)]
    hashing: HashingConfig,
    #[serde(default)]
    server: ServerConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConnection {
    host: Option<String>,
    user: Option<String>,
    password: Option<String>,
    #[serde(alias = "dbname", alias = "database_name")]
    database_name: Option<String>,
    port: Option<RawPort>,
    #[serde(alias = "sslmode", alias = "ssl_mode")]
    ssl_mode: Option<String>,
}

/// Ports are integers, but the legacy layout wrote them as strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPort {
    Number(i64),
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawPool {
    max_connections: u32,
    min_connections: u32,
    acquire_timeout_ms: u64,
}

impl Default for RawPool {
    fn default() -> Self {
        let defaults = PoolConfig::default();
        Self {
            max_connections: defaults.max_connections,
            min_connections: defaults.min_connections,
            acquire_timeout_ms: defaults.acquire_timeout.as_millis() as u64,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawRegistration {
    email_case: EmailCase,
    min_password_length: usize,
    max_password_length: usize,
    max_email_length: usize,
    persist_timeout_ms: u64,
}

impl Default for RawRegistration {
    fn default() -> Self {
        let defaults = RegistrationPolicy::default();
        Self {
            email_case: defaults.email_case,
            min_password_length: defaults.min_password_length,
            max_password_length: defaults.max_password_length,
            max_email_length: defaults.max_email_length,
            persist_timeout_ms: defaults.persist_timeout.as_millis() as u64,
        }
    }
}

/// Widest email the `accounts.email` column can hold.
const EMAIL_COLUMN_WIDTH: usize = 320;

impl RawDocument {
    fn validate(self) -> Result<Configuration, ConfigError> {
        let engine: EngineKind = self
            .engine_kind
            .as_deref()
            .ok_or_else(|| ConfigError::MissingField("engineKind".to_string()))?
            .parse()?;

        let (section, raw) = match (self.connection, engine) {
            (Some(conn), _) => ("connection", conn),
            (None, EngineKind::Postgres) => ("postgres", self.postgres.ok_or_else(|| {
                ConfigError::MissingField("connection".to_string())
            })?),
            (None, EngineKind::MySql) => ("mysql", self.mysql.ok_or_else(|| {
                ConfigError::MissingField("connection".to_string())
            })?),
        };

        let connection = raw.validate(section, engine)?;

        let pool = self.pool.validate()?;
        let registration = self.registration.validate()?;
        self.hashing.params()?;

        if self.server.port == 0 {
            return Err(ConfigError::invalid("server.port", "must be between 1 and 65535"));
        }

        Ok(Configuration {
            database: DatabaseConfig { engine, connection },
            pool,
            registration,
            hashing: self.hashing,
            server: self.server,
        })
    }
}

impl RawConnection {
    fn validate(
        self,
        section: &str,
        engine: EngineKind,
    ) -> Result<ConnectionParameters, ConfigError> {
        let field = |name: &str| format!("{}.{}", section, name);

        let required = |value: Option<String>, name: &str| -> Result<String, ConfigError> {
            let value = value.ok_or_else(|| ConfigError::MissingField(field(name)))?;
            if value.trim().is_empty() {
                return Err(ConfigError::invalid(field(name), "must not be empty"));
            }
            Ok(value)
        };

        let host = required(self.host, "host")?;
        let user = required(self.user, "user")?;
        let database_name = required(self.database_name, "databaseName")?;
        // An empty password is legitimate for trust authentication.
        let password = self
            .password
            .ok_or_else(|| ConfigError::MissingField(field("password")))?;

        let port = match self.port {
            None => return Err(ConfigError::MissingField(field("port"))),
            Some(RawPort::Number(n)) => n,
            Some(RawPort::Text(text)) => text.trim().parse::<i64>().map_err(|_| {
                ConfigError::invalid(field("port"), format!("not an integer: {:?}", text))
            })?,
        };
        let port = u16::try_from(port)
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| {
                ConfigError::invalid(field("port"), format!("{} is not between 1 and 65535", port))
            })?;

        let ssl_mode = match self.ssl_mode.filter(|mode| !mode.trim().is_empty()) {
            None => engine.default_ssl_mode().to_string(),
            Some(mode) => {
                let mode = mode.trim().to_ascii_lowercase();
                if !engine.ssl_modes().contains(&mode.as_str()) {
                    return Err(ConfigError::invalid(
                        field("sslMode"),
                        format!(
                            "{:?} is not supported by {} (expected one of {})",
                            mode,
                            engine,
                            engine.ssl_modes().join(", ")
                        ),
                    ));
                }
                mode
            }
        };

        Ok(ConnectionParameters {
            host,
            user,
            password,
            database_name,
            port,
            ssl_mode,
        })
    }
}

impl RawPool {
    fn validate(self) -> Result<PoolConfig, ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::invalid("pool.maxConnections", "must be at least 1"));
        }
        if self.min_connections > self.max_connections {
            return Err(ConfigError::invalid(
                "pool.minConnections",
                "must not exceed pool.maxConnections",
            ));
        }
        if self.acquire_timeout_ms == 0 {
            return Err(ConfigError::invalid("pool.acquireTimeoutMs", "must be positive"));
        }

        Ok(PoolConfig {
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            acquire_timeout: Duration::from_millis(self.acquire_timeout_ms),
        })
    }
}

impl RawRegistration {
    fn validate(self) -> Result<RegistrationPolicy, ConfigError> {
        if self.min_password_length == 0 {
            return Err(ConfigError::invalid(
                "registration.minPasswordLength",
                "must be at least 1",
            ));
        }
        if self.max_password_length < self.min_password_length {
            return Err(ConfigError::invalid(
                "registration.maxPasswordLength",
                "must not be smaller than registration.minPasswordLength",
            ));
        }
        if !(3..=EMAIL_COLUMN_WIDTH).contains(&self.max_email_length) {
            return Err(ConfigError::invalid(
                "registration.maxEmailLength",
                format!("must be between 3 and {}", EMAIL_COLUMN_WIDTH),
            ));
        }
        if self.persist_timeout_ms == 0 {
            return Err(ConfigError::invalid("registration.persistTimeoutMs", "must be positive"));
        }

        Ok(RegistrationPolicy {
            email_case: self.email_case,
            min_password_length: self.min_password_length,
            max_password_length: self.max_password_length,
            max_email_length: self.max_email_length,
            persist_timeout: Duration::from_millis(self.persist_timeout_ms),
        })
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
