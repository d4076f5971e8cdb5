// ============================================================================
// Store Connector - Engine selection, pool setup and schema bootstrap
// ============================================================================
//
// `connect` dispatches on the configured engine exactly once and returns a
// `StoreHandle` owning the process-wide pool. Everything after that goes
// through the `AccountStore` the handle hands out; nobody re-dispatches on
// the engine per call.
//
// Connection failures are returned, never retried here. The process entry
// point decides to abort.
//
// ============================================================================

mod memory;
mod mysql;
mod postgres;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlPool;
use sqlx::postgres::PgPool;

use crate::config::{DatabaseConfig, EngineKind, PoolConfig};
use crate::domain::account::{Account, AccountId, AccountStore, Email, HashedSecret, StoreError};

pub use memory::MemoryAccountStore;
pub use mysql::MySqlAccountStore;
pub use postgres::PostgresAccountStore;

/// Name of the unique constraint guarding `accounts.email` on both engines.
pub const EMAIL_UNIQUE_CONSTRAINT: &str = "accounts_email_key";

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Invalid {engine} connection options: {reason}")]
    InvalidOptions { engine: EngineKind, reason: String },

    #[error("Cannot reach {engine} at {target}: {source}")]
    Unreachable {
        engine: EngineKind,
        target: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Failed to ensure {engine} account schema: {source}")]
    Schema {
        engine: EngineKind,
        #[source]
        source: sqlx::Error,
    },
}

/// Long-lived handle to the relational store. Owned by the process; cloning
/// shares the same pool.
#[derive(Debug, Clone)]
pub enum StoreHandle {
    Postgres(PgPool),
    MySql(MySqlPool),
}

/// Open the pool, check the store answers, and make sure the schema exists.
pub async fn connect(
    database: &DatabaseConfig,
    pool: &PoolConfig,
) -> Result<StoreHandle, ConnectionError> {
    let engine = database.engine;
    let target = match engine {
        EngineKind::Postgres => postgres::describe(&database.connection),
        EngineKind::MySql => mysql::describe(&database.connection),
    };

    tracing::info!(
        engine = %engine,
        target = %target,
        max_connections = pool.max_connections,
        "Connecting to account store..."
    );

    let handle = match engine {
        EngineKind::Postgres => {
            StoreHandle::Postgres(postgres::open(&database.connection, pool).await?)
        }
        EngineKind::MySql => StoreHandle::MySql(mysql::open(&database.connection, pool).await?),
    };

    handle
        .verify_reachability()
        .await
        .map_err(|source| ConnectionError::Unreachable {
            engine,
            target: target.clone(),
            source,
        })?;

    handle.ensure_schema().await?;

    tracing::info!(engine = %engine, target = %target, "✅ Account store ready");
    Ok(handle)
}

impl StoreHandle {
    pub fn engine(&self) -> EngineKind {
        match self {
            StoreHandle::Postgres(_) => EngineKind::Postgres,
            StoreHandle::MySql(_) => EngineKind::MySql,
        }
    }

    pub async fn verify_reachability(&self) -> Result<(), sqlx::Error> {
        match self {
            StoreHandle::Postgres(pool) => sqlx::query("SELECT 1").execute(pool).await.map(|_| ()),
            StoreHandle::MySql(pool) => sqlx::query("SELECT 1").execute(pool).await.map(|_| ()),
        }
    }

    /// Idempotent: running it against an existing schema changes nothing.
    pub async fn ensure_schema(&self) -> Result<(), ConnectionError> {
        let result = match self {
            StoreHandle::Postgres(pool) => postgres::ensure_schema(pool).await,
            StoreHandle::MySql(pool) => mysql::ensure_schema(pool).await,
        };

        result.map_err(|source| ConnectionError::Schema {
            engine: self.engine(),
            source,
        })
    }

    pub fn account_store(&self) -> Arc<dyn AccountStore> {
        match self {
            StoreHandle::Postgres(pool) => Arc::new(PostgresAccountStore::new(pool.clone())),
            StoreHandle::MySql(pool) => Arc::new(MySqlAccountStore::new(pool.clone())),
        }
    }

    /// Drain and close the pool. Only the process owner calls this, at shutdown.
    pub async fn close(&self) {
        match self {
            StoreHandle::Postgres(pool) => pool.close().await,
            StoreHandle::MySql(pool) => pool.close().await,
        }
        tracing::info!(engine = %self.engine(), "Account store closed");
    }
}

// ============================================================================
// Row mapping and error translation shared by both engines
// ============================================================================

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AccountRow {
    id: i64,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Self {
            id: AccountId(row.id),
            email: Email::new(row.email),
            password_hash: HashedSecret::from_encoded(row.password_hash),
            created_at: row.created_at,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            // MySQL does not report constraint names; the only unique key
            // besides the primary key is the email one.
            sqlx::Error::Database(db)
                if db.is_unique_violation()
                    && db.constraint().map_or(true, |c| c == EMAIL_UNIQUE_CONSTRAINT) =>
            {
                StoreError::DuplicateEmail
            }
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => StoreError::Unavailable(err.to_string()),
            _ => StoreError::Query(err.to_string()),
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
    fn test_pool_errors_are_unavailable() {
        assert!(matches!(StoreError::from(sqlx::Error::PoolTimedOut), StoreError::Unavailable(_)));
        assert!(matches!(StoreError::from(sqlx::Error::PoolClosed), StoreError::Unavailable(_)));

        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        assert!(matches!(StoreError::from(sqlx::Error::Io(io)), StoreError::Unavailable(_)));
    }

    #[test]
    fn test_row_not_found_is_query_error() {
        assert!(matches!(StoreError::from(sqlx::Error::RowNotFound), StoreError::Query(_)));
    }

    #[test]
    fn test_row_maps_to_account() {
        let created_at = Utc::now();
        let account = Account::from(AccountRow {
            id: 42,
            email: "a@x.com".to_string(),
            password_hash: "$argon2id$...".to_string(),
            created_at,
        });

        assert_eq!(account.id, AccountId(42));
        assert_eq!(account.email.as_str(), "a@x.com");
        assert_eq!(account.password_hash.as_str(), "$argon2id$...");
        assert_eq!(account.created_at, created_at);
    }

    #[tokio::test]
    async fn test_connect_unreachable_fails_fast() {
        let database = DatabaseConfig {
            engine: EngineKind::Postgres,
            connection: crate::config::ConnectionParameters {
                host: "127.0.0.1".to_string(),
                user: "u".to_string(),
                password: "p".to_string(),
                database_name: "d".to_string(),
                // Reserved port; nothing listens here.
                port: 1,
                ssl_mode: "disable".to_string(),
            },
        };
        let pool = PoolConfig {
            acquire_timeout: std::time::Duration::from_millis(500),
            ..PoolConfig::default()
        };

        let err = connect(&database, &pool).await.unwrap_err();
        assert!(matches!(err, ConnectionError::Unreachable { engine: EngineKind::Postgres, .. }));
        assert!(err.to_string().contains("password=***"));
    }
}
