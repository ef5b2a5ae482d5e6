//! Environment-driven connection configuration.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use thiserror::Error;

/// Configuration failure when reading the environment.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required environment variable is not set
    #[error("missing environment variable {0}")]
    MissingVar(&'static str),

    /// An environment variable is set but unparseable
    #[error("invalid value for {0}: {1}")]
    InvalidVar(&'static str, String),
}

/// Connection settings for the booking store.
#[derive(Clone, Debug)]
pub struct PostgresConfig {
    /// Postgres connection string
    pub database_url: String,
    /// Pool size cap
    pub max_connections: u32,
    /// How long to wait for a connection from the pool
    pub acquire_timeout: Duration,
}

impl PostgresConfig {
    /// Reads configuration from the environment, loading `.env` first.
    ///
    /// `DATABASE_URL` is required. `ROOMHIRE_PG_MAX_CONNECTIONS` (default 5)
    /// and `ROOMHIRE_PG_ACQUIRE_TIMEOUT_SECS` (default 5) are optional.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when `DATABASE_URL` is missing or an
    /// override fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL"))?;
        let max_connections = parse_var("ROOMHIRE_PG_MAX_CONNECTIONS", 5)?;
        let timeout_secs = parse_var("ROOMHIRE_PG_ACQUIRE_TIMEOUT_SECS", 5u64)?;

        Ok(Self {
            database_url,
            max_connections,
            acquire_timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Opens a connection pool with these settings.
    ///
    /// # Errors
    ///
    /// Returns the underlying `sqlx` error when the pool cannot connect.
    pub async fn connect(&self) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout)
            .connect(&self.database_url)
            .await
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidVar(name, raw)),
        Err(_) => Ok(default),
    }
}
