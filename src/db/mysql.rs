use std::str::FromStr;

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlSslMode};

use crate::config::{ConnectionParameters, EngineKind, PoolConfig};
use crate::domain::account::{Account, AccountStore, Email, HashedSecret, StoreError};

use super::{AccountRow, ConnectionError};

// ============================================================================
// MySQL engine
// ============================================================================

// utf8mb4_bin keeps the uniqueness comparison byte-exact; the default
// collation would fold case and accents behind the service's back.
const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS accounts (
    id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
    email VARCHAR(320) CHARACTER SET utf8mb4 COLLATE utf8mb4_bin NOT NULL,
    password_hash VARCHAR(255) NOT NULL,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    CONSTRAINT accounts_email_key UNIQUE (email)
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4";

const CHARSET: &str = "utf8mb4";

pub(super) fn describe(params: &ConnectionParameters) -> String {
    format!(
        "mysql://{}:***@{}:{}/{}?charset={}&ssl-mode={}",
        params.user, params.host, params.port, params.database_name, CHARSET, params.ssl_mode
    )
}

fn connect_options(params: &ConnectionParameters) -> Result<MySqlConnectOptions, ConnectionError> {
    let ssl_mode =
        MySqlSslMode::from_str(&params.ssl_mode).map_err(|e| ConnectionError::InvalidOptions {
            engine: EngineKind::MySql,
            reason: e.to_string(),
        })?;

    Ok(MySqlConnectOptions::new()
        .host(&params.host)
        .port(params.port)
        .username(&params.user)
        .password(&params.password)
        .database(&params.database_name)
        .charset(CHARSET)
        .ssl_mode(ssl_mode))
}

pub(super) async fn open(
    params: &ConnectionParameters,
    pool: &PoolConfig,
) -> Result<MySqlPool, ConnectionError> {
    let options = connect_options(params)?;

    MySqlPoolOptions::new()
        .max_connections(pool.max_connections)
        .min_connections(pool.min_connections)
        .acquire_timeout(pool.acquire_timeout)
        .connect_with(options)
        .await
        .map_err(|source| ConnectionError::Unreachable {
            engine: EngineKind::MySql,
            target: describe(params),
            source,
        })
}

pub(super) async fn ensure_schema(pool: &MySqlPool) -> Result<(), sqlx::Error> {
    sqlx::query(SCHEMA).execute(pool).await?;
    tracing::debug!("Ensured accounts table on mysql");
    Ok(())
}

#[derive(Debug, Clone)]
pub struct MySqlAccountStore {
    pool: MySqlPool,
}

impl MySqlAccountStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for MySqlAccountStore {
    fn engine(&self) -> &'static str {
        EngineKind::MySql.as_str()
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query_as::<_, AccountRow>(
            "SELECT id, email, password_hash, created_at FROM accounts WHERE email = ?",
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
        // MySQL has no RETURNING; read the row back inside the same
        // transaction. Dropping `tx` on any error rolls the insert back.
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("INSERT INTO accounts (email, password_hash) VALUES (?, ?)")
            .bind(email.as_str())
            .bind(password_hash.as_str())
            .execute(&mut *tx)
            .await?;

        let id = i64::try_from(result.last_insert_id()).map_err(|_| {
            StoreError::Query(format!("account id {} out of range", result.last_insert_id()))
        })?;

        let row = sqlx::query_as::<_, AccountRow>(
            "SELECT id, email, password_hash, created_at FROM accounts WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let account = Account::from(row);
        tracing::debug!(account_id = %account.id, "Inserted account row");
        Ok(account)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
