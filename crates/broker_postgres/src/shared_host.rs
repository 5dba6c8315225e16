use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use sqlx::MySqlPool;
use tracing::info;

use broker_core::ports::SharedTenantHost;
use broker_core::types::validate_resource_name;

/// Shared multi-tenant MySQL host. Each shared-plan database is one schema.
#[derive(Clone, Debug)]
pub struct MySqlSharedHost {
    pool: MySqlPool,
}

impl MySqlSharedHost {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

/// Backtick-quote a schema name. DDL identifiers cannot be bound as
/// parameters, so only names that pass resource-name validation (no
/// backticks, quotes or whitespace) are accepted.
pub fn quote_schema_name(name: &str) -> Result<String> {
    if validate_resource_name(name).is_err() {
        bail!("refusing to quote invalid schema name '{name}'");
    }
    Ok(format!("`{name}`"))
}

#[async_trait]
impl SharedTenantHost for MySqlSharedHost {
    async fn drop_database(&self, name: &str) -> Result<()> {
        let statement = format!("DROP DATABASE IF EXISTS {}", quote_schema_name(name)?);
        // Text protocol: schema DDL does not go through prepared statements.
        sqlx::raw_sql(&statement)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to drop schema {name}"))?;
        info!(name = %name, "schema dropped on shared host");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_valid_names() {
        assert_eq!(quote_schema_name("tenant_1").unwrap(), "`tenant_1`");
    }

    #[test]
    fn rejects_injection_attempts() {
        assert!(quote_schema_name("x`; DROP DATABASE mysql; --").is_err());
        assert!(quote_schema_name("a b").is_err());
        assert!(quote_schema_name("").is_err());
    }
}
