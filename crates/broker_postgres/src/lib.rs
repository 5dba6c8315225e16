//! broker_postgres: sqlx adapters for the broker's ports.
//!
//! `PgLedgerStore` is the Ledger Store over the Postgres broker database;
//! `MySqlSharedHost` drops tenant schemas on the shared MySQL host. Both pools
//! are created once at start-up and shared by every request.

pub mod shared_host;
pub mod store;

use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

pub use shared_host::MySqlSharedHost;
pub use store::PgLedgerStore;

/// Connection-pool limits. A small idle floor and a modest cap keep the
/// backing stores from being swamped.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub max_lifetime: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 20,
            min_connections: 4,
            acquire_timeout: Duration::from_secs(30),
            max_lifetime: Some(Duration::from_secs(3600)),
        }
    }
}

pub async fn connect_ledger(url: &str, config: &PoolConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .max_lifetime(config.max_lifetime)
        .connect(url)
        .await
        .context("failed to connect to broker database")?;
    info!(max = config.max_connections, "connected to broker database");
    Ok(pool)
}

pub async fn connect_shared_host(url: &str, config: &PoolConfig) -> Result<MySqlPool> {
    let pool = MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .max_lifetime(config.max_lifetime)
        .connect(url)
        .await
        .context("failed to connect to shared-tenant host")?;
    info!(max = config.max_connections, "connected to shared-tenant host");
    Ok(pool)
}
