//! Postgres implementation of the Ledger Store.
//!
//! All SQL is runtime-checked (sqlx::query, not sqlx::query!) to avoid a
//! compile-time DB requirement, and every value is bound as a parameter.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::debug;

use broker_core::plan::Plan;
use broker_core::ports::{ClaimOutcome, LedgerStore};
use broker_core::types::{ClaimState, Credentials, InventoryRecord};

/// Raw ledger row as stored.
#[derive(Debug, FromRow)]
struct LedgerRow {
    name: String,
    plan: String,
    claimed: String,
    make_date: DateTime<Utc>,
    masteruser: String,
    masterpass: String,
    endpoint: String,
    reader_endpoint: String,
}

impl TryFrom<LedgerRow> for InventoryRecord {
    type Error = anyhow::Error;

    fn try_from(row: LedgerRow) -> Result<Self> {
        let plan: Plan = row
            .plan
            .parse()
            .map_err(|e| anyhow!("ledger row {}: {e}", row.name))?;
        let claimed = ClaimState::from_column(&row.claimed)
            .ok_or_else(|| anyhow!("ledger row {}: bad claimed value '{}'", row.name, row.claimed))?;
        Ok(InventoryRecord {
            name: row.name,
            plan,
            claimed,
            created_at: row.make_date,
            credentials: Credentials {
                username: row.masteruser,
                password: row.masterpass,
                endpoint: row.endpoint,
                reader_endpoint: row.reader_endpoint,
            },
        })
    }
}

/// Postgres-backed ledger of pooled databases.
#[derive(Clone, Debug)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the ledger table and its selection index if they don't exist.
    pub async fn initialize_schema(&self) -> Result<()> {
        sqlx::raw_sql(
            r#"
            CREATE TABLE IF NOT EXISTS aurora_mysql_provision (
                name TEXT PRIMARY KEY,
                plan TEXT NOT NULL,
                claimed TEXT NOT NULL DEFAULT 'no' CHECK (claimed IN ('yes', 'no')),
                make_date TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                masteruser TEXT NOT NULL,
                masterpass TEXT NOT NULL,
                endpoint TEXT NOT NULL,
                reader_endpoint TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_aurora_mysql_provision_selection
            ON aurora_mysql_provision(plan, claimed, make_date);
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to initialize ledger schema")?;
        Ok(())
    }

    fn log_pool_stats(&self) {
        debug!(
            size = self.pool.size(),
            idle = self.pool.num_idle(),
            "ledger pool stats"
        );
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn find_oldest_unclaimed(&self, plan: Plan) -> Result<Option<String>> {
        let name = sqlx::query_scalar::<_, String>(
            r#"
            SELECT name
            FROM aurora_mysql_provision
            WHERE plan = $1
              AND claimed = $2
            ORDER BY make_date ASC, name ASC
            LIMIT 1
            "#,
        )
        .bind(plan.as_str())
        .bind(ClaimState::Unclaimed.as_column())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to select oldest unclaimed record")?;
        Ok(name)
    }

    async fn claim(&self, name: &str) -> Result<ClaimOutcome> {
        let result = sqlx::query(
            r#"
            UPDATE aurora_mysql_provision
            SET claimed = $2
            WHERE name = $1
              AND claimed = $3
            "#,
        )
        .bind(name)
        .bind(ClaimState::Claimed.as_column())
        .bind(ClaimState::Unclaimed.as_column())
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to claim {name}"))?;
        self.log_pool_stats();

        Ok(if result.rows_affected() == 1 {
            ClaimOutcome::Claimed
        } else {
            ClaimOutcome::Conflict
        })
    }

    async fn release(&self, name: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE aurora_mysql_provision
            SET claimed = $2
            WHERE name = $1
              AND claimed = $3
            "#,
        )
        .bind(name)
        .bind(ClaimState::Unclaimed.as_column())
        .bind(ClaimState::Claimed.as_column())
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to release {name}"))?;
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM aurora_mysql_provision WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete ledger row {name}"))?;
        debug!(name = %name, rows = result.rows_affected(), "ledger rows removed");
        Ok(result.rows_affected())
    }

    async fn get(&self, name: &str) -> Result<Option<InventoryRecord>> {
        let row = sqlx::query_as::<_, LedgerRow>(
            r#"
            SELECT name, plan, claimed, make_date,
                   masteruser, masterpass, endpoint, reader_endpoint
            FROM aurora_mysql_provision
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to load ledger row {name}"))?;
        self.log_pool_stats();
        row.map(InventoryRecord::try_from).transpose()
    }
}
