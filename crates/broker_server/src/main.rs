//! broker_server: standalone REST server for the database broker.
//!
//! Configuration is read from env vars (see `broker_server::config`).
//! Exits with status 2 when configuration is missing or invalid.

use std::sync::Arc;

use anyhow::Context;
use broker_aws::{RdsProvider, RdsProviderConfig};
use broker_core::ports::{LedgerStore, ProviderClient, SharedTenantHost};
use broker_core::service::{BrokerService, BrokerServiceImpl};
use broker_postgres::{connect_ledger, connect_shared_host, MySqlSharedHost, PgLedgerStore};
use broker_server::config::BrokerConfig;
use broker_server::router::build_router;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,broker_server=debug".into()),
        )
        .init();

    dotenvy::dotenv().ok();

    let config = match BrokerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(2);
        }
    };
    tracing::info!(
        environment = %config.environment,
        region = %config.region,
        "starting database broker"
    );

    // Process-wide handles, built once and shared by every request.
    let ledger_pool = connect_ledger(&config.broker_db_url, &config.pool).await?;
    let hobby_pool = connect_shared_host(&config.hobby_db_url, &config.pool).await?;

    let ledger = PgLedgerStore::new(ledger_pool);
    if config.init_schema {
        ledger.initialize_schema().await?;
        tracing::info!("ledger schema initialized");
    }

    let provider = RdsProvider::new(&RdsProviderConfig {
        operation_timeout: config.provider_timeout,
        ..RdsProviderConfig::new(&config.region)
    })
    .await;

    let service: Arc<dyn BrokerService> = Arc::new(BrokerServiceImpl::new(
        Arc::new(ledger) as Arc<dyn LedgerStore>,
        Arc::new(provider) as Arc<dyn ProviderClient>,
        Arc::new(MySqlSharedHost::new(hobby_pool)) as Arc<dyn SharedTenantHost>,
        config.settings(),
    ));

    let app = build_router(service);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;
    tracing::info!("broker listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested, draining in-flight requests");
        })
        .await
        .context("server error")?;
    Ok(())
}
