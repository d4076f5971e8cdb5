//! Account registration service.
//!
//! Accepts an (email, password) pair, enforces email uniqueness through the
//! store's own constraint, hashes the password with Argon2id and persists the
//! account in PostgreSQL or MySQL.
//!
//! Startup order: [`config::ConfigResolver`] -> [`db::connect`] ->
//! [`db::StoreHandle::account_store`] -> [`domain::account::RegistrationService`].
//! Nothing in this crate terminates the process; every startup failure is
//! returned to the caller.

pub mod config;
pub mod db;
pub mod domain;
pub mod http;
pub mod metrics;

pub use config::{ConfigError, ConfigResolver, ConfigSource, Configuration, EngineKind};
pub use db::{connect, ConnectionError, StoreHandle};
pub use domain::account::{
    AccountStore, AccountSummary, ErrorKind, PasswordHasher, RegistrationError, RegistrationService,
};
