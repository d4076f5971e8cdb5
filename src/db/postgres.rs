use std::str::FromStr;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};

use crate::config::{ConnectionParameters, EngineKind, PoolConfig};
use crate::domain::account::{Account, AccountStore, Email, HashedSecret, StoreError};

use super::{AccountRow, ConnectionError};

// ============================================================================
// PostgreSQL engine
// ============================================================================

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS accounts (
    id BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,
    email VARCHAR(320) NOT NULL,
    password_hash VARCHAR(255) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT accounts_email_key UNIQUE (email)
)";

/// libpq-style key/value description with the password masked.
pub(super) fn describe(params: &ConnectionParameters) -> String {
    format!(
        "host={} port={} user={} password=*** dbname={} sslmode={}",
        params.host, params.port, params.user, params.database_name, params.ssl_mode
    )
}

fn connect_options(params: &ConnectionParameters) -> Result<PgConnectOptions, ConnectionError> {
    let ssl_mode =
        PgSslMode::from_str(&params.ssl_mode).map_err(|e| ConnectionError::InvalidOptions {
            engine: EngineKind::Postgres,
            reason: e.to_string(),
        })?;

    Ok(PgConnectOptions::new()
        .host(&params.host)
        .port(params.port)
        .username(&params.user)
        .password(&params.password)
        .database(&params.database_name)
        .ssl_mode(ssl_mode))
}

pub(super) async fn open(
    params: &ConnectionParameters,
    pool: &PoolConfig,
) -> Result<PgPool, ConnectionError> {
    let options = connect_options(params)?;

    PgPoolOptions::new()
        .max_connections(pool.max_connections)
        .min_connections(pool.min_connections)
        .acquire_timeout(pool.acquire_timeout)
        .connect_with(options)
        .await
        .map_err(|source| ConnectionError::Unreachable {
            engine: EngineKind::Postgres,
            target: describe(params),
            source,
        })
}

pub(super) async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(SCHEMA).execute(pool).await?;
    tracing::debug!("Ensured accounts table on postgres");
    Ok(())
}

#[derive(Debug, Clone)]
pub struct PostgresAccountStore {
    pool: PgPool,
}

impl PostgresAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PostgresAccountStore {
    fn engine(&self) -> &'static str {
        EngineKind::Postgres.as_str()
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query_as::<_, AccountRow>(
            "SELECT id, email, password_hash, created_at FROM accounts WHERE email = $1",
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Account::from))
    }

    async fn insert_if_absent(
        &self,
        email: &Email,
        password_hash: &HashedSecret,
    ) -> Result<Account, StoreError> {
        // No ON CONFLICT: the unique violation must surface as DuplicateEmail.
        let row = sqlx::query_as::<_, AccountRow>(
            "INSERT INTO accounts (email, password_hash) VALUES ($1, $2)
             RETURNING id, email, password_hash, created_at",
        )
        .bind(email.as_str())
        .bind(password_hash.as_str())
        .fetch_one(&self.pool)
        .await?;

        let account = Account::from(row);
        tracing::debug!(account_id = %account.id, "Inserted account row");
        Ok(account)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
