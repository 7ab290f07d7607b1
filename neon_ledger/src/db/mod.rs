//! PostgreSQL connection handling for the ledger store.
//!
//! [`Database::connect`] opens the pool, [`Database::open_store`] applies the
//! bundled schema and hands back a [`PgStore`] sharing that pool.

use serde::Serialize;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::store::{PgStore, StoreError, StoreResult};

pub mod config;

pub use config::DatabaseConfig;

/// Owner of the connection pool behind a [`PgStore`]
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
    max_connections: u32,
}

/// Snapshot of pool occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStatus {
    pub open: u32,
    pub idle: usize,
    pub max: u32,
}

impl Database {
    /// Validate the pool settings and connect.
    ///
    /// ```no_run
    /// use neon_ledger::db::{Database, DatabaseConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let db = Database::connect(&DatabaseConfig::from_env()?).await?;
    ///     let store = db.open_store().await?;
    ///     # drop(store);
    ///     db.close().await;
    ///     Ok(())
    /// }
    /// ```
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        config
            .validate()
            .map_err(|err| StoreError::Backend(err.to_string()))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .test_before_acquire(true)
            .connect(&config.database_url)
            .await?;

        log::info!(
            "Connected to {} (pool {}..{})",
            redact_url(&config.database_url),
            config.min_connections,
            config.max_connections
        );
        Ok(Self {
            pool,
            max_connections: config.max_connections,
        })
    }

    /// Apply the ledger schema and return a store over this pool
    pub async fn open_store(&self) -> StoreResult<PgStore> {
        let store = PgStore::new(self.pool.clone());
        store.migrate().await?;
        log::debug!("Ledger schema applied");
        Ok(store)
    }

    pub fn pool_status(&self) -> PoolStatus {
        PoolStatus {
            open: self.pool.size(),
            idle: self.pool.num_idle(),
            max: self.max_connections,
        }
    }

    /// Wait for checked-out connections to return, then close the pool
    pub async fn close(self) {
        let status = self.pool_status();
        log::info!(
            "Closing database pool ({} open, {} idle)",
            status.open,
            status.idle
        );
        self.pool.close().await;
    }
}

/// Connection string with the password masked, for logs
pub fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((credentials, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match credentials.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:***@{host}"),
        None => url.to_string(),
    }
}
