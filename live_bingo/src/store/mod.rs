//! Storage layer: PostgreSQL connection pooling and repository abstractions.
//!
//! The engine only talks to the repository traits in [`repository`]; the
//! [`PgStore`](pg::PgStore) implementation is the durable source of truth,
//! and [`MemoryStore`](memory::MemoryStore) backs tests and local runs.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::env;
use std::time::Duration;
use thiserror::Error;

pub mod memory;
pub mod pg;
pub mod repository;

pub use memory::MemoryStore;
pub use pg::PgStore;
pub use repository::{AuditRepository, CardRepository, JackpotRepository, SessionRepository};

/// Infrastructure-level storage failure, kept distinct from domain
/// rejections so the API layer can choose retry vs. 5xx semantics.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage conflict: {0}")]
    Conflict(String),
}

/// Result alias for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Database configuration.
#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connection_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

impl DatabaseConfig {
    /// Load configuration from environment variables. `DATABASE_URL` is
    /// required; pool tuning falls back to defaults.
    ///
    /// # Panics
    ///
    /// Panics if `DATABASE_URL` is not set or a tuning variable fails to
    /// parse.
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            max_connections: parse_env_or("DB_MAX_CONNECTIONS", 20),
            min_connections: parse_env_or("DB_MIN_CONNECTIONS", 5),
            connection_timeout_secs: parse_env_or("DB_CONNECTION_TIMEOUT_SECS", 10),
            idle_timeout_secs: parse_env_or("DB_IDLE_TIMEOUT_SECS", 600),
            max_lifetime_secs: parse_env_or("DB_MAX_LIFETIME_SECS", 1800),
        }
    }
}

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T {
    env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new connection pool from configuration.
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check if the database connection is healthy.
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close the connection pool.
    pub async fn close(self) {
        self.pool.close().await;
    }
}
