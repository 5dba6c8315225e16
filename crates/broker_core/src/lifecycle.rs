//! Lifecycle Manager: deprovisioning of claimed databases.
//!
//! External teardown always runs before the ledger row is removed. A failed
//! step leaves the row (still claimed) in place, so re-issuing the delete
//! resumes the teardown; provider steps treat "already gone" as done.

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use crate::arn::member_instance_ids;
use crate::error::{BrokerError, ProviderError};
use crate::plan::{Backing, Plan};
use crate::ports::{LedgerStore, ProviderClient, SharedTenantHost};
use crate::Result;

/// One external call made while tearing a resource down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeardownStep {
    DropDatabase(String),
    DeleteInstance(String),
    DeleteCluster(String),
}

impl fmt::Display for TeardownStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeardownStep::DropDatabase(name) => write!(f, "drop-database {name}"),
            TeardownStep::DeleteInstance(id) => write!(f, "delete-instance {id}"),
            TeardownStep::DeleteCluster(id) => write!(f, "delete-cluster {id}"),
        }
    }
}

/// Ordered provider calls for a dedicated cluster: writer, reader, cluster.
pub fn dedicated_teardown(name: &str, region: &str) -> Vec<TeardownStep> {
    let [writer, reader] = member_instance_ids(name, region);
    vec![
        TeardownStep::DeleteInstance(writer),
        TeardownStep::DeleteInstance(reader),
        TeardownStep::DeleteCluster(name.to_string()),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub step: TeardownStep,
    /// The provider reported the resource as already deleted or deleting.
    pub already_gone: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeprovisionOutcome {
    pub name: String,
    pub plan: Plan,
    pub steps: Vec<StepOutcome>,
    pub ledger_rows_removed: u64,
}

pub struct Deprovisioner {
    ledger: Arc<dyn LedgerStore>,
    provider: Arc<dyn ProviderClient>,
    shared_host: Arc<dyn SharedTenantHost>,
    region: String,
}

impl Deprovisioner {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        provider: Arc<dyn ProviderClient>,
        shared_host: Arc<dyn SharedTenantHost>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            ledger,
            provider,
            shared_host,
            region: region.into(),
        }
    }

    /// Tear down the claimed database `name`, then remove its ledger row.
    ///
    /// Absent and unclaimed names are `NotFound`: pool inventory is never
    /// destroyed through this path.
    pub async fn deprovision(&self, name: &str) -> Result<DeprovisionOutcome> {
        let record = self
            .ledger
            .get(name)
            .await
            .map_err(BrokerError::Ledger)?
            .filter(|r| r.is_claimed())
            .ok_or_else(|| BrokerError::NotFound(format!("claimed database '{name}'")))?;

        let steps = match record.plan.backing() {
            Backing::SharedTenant => self.drop_schema(name).await?,
            Backing::DedicatedCluster => self.teardown_cluster(name).await?,
        };

        let ledger_rows_removed = self.ledger.remove(name).await.map_err(BrokerError::Ledger)?;
        if ledger_rows_removed == 0 {
            warn!(name = %name, "ledger row already removed by a concurrent delete");
        }
        info!(name = %name, plan = %record.plan, "database deprovisioned");

        Ok(DeprovisionOutcome {
            name: name.to_string(),
            plan: record.plan,
            steps,
            ledger_rows_removed,
        })
    }

    async fn drop_schema(&self, name: &str) -> Result<Vec<StepOutcome>> {
        self.shared_host
            .drop_database(name)
            .await
            .map_err(BrokerError::SharedHost)?;
        info!(name = %name, "dropped shared-tenant schema");
        Ok(vec![StepOutcome {
            step: TeardownStep::DropDatabase(name.to_string()),
            already_gone: false,
        }])
    }

    /// Stops at the first failing step.
    async fn teardown_cluster(&self, name: &str) -> Result<Vec<StepOutcome>> {
        let mut done: Vec<StepOutcome> = Vec::new();
        for step in dedicated_teardown(name, &self.region) {
            let result = match &step {
                TeardownStep::DeleteInstance(id) => self.provider.delete_instance(id).await,
                TeardownStep::DeleteCluster(id) => self.provider.delete_cluster(id).await,
                TeardownStep::DropDatabase(_) => Err(ProviderError::Fatal(format!(
                    "{step} is not a provider call"
                ))),
            };

            let already_gone = match result {
                Ok(()) => false,
                Err(e) if e.is_already_gone() => {
                    info!(step = %step, reason = %e, "teardown step already satisfied");
                    true
                }
                Err(source) if done.is_empty() => {
                    warn!(name = %name, step = %step, error = %source, "teardown failed, ledger row kept");
                    return Err(BrokerError::Provider(source));
                }
                Err(source) => {
                    warn!(name = %name, step = %step, error = %source, "partial teardown, ledger row kept");
                    return Err(BrokerError::PartialTeardown {
                        name: name.to_string(),
                        step,
                        completed: done.into_iter().map(|o| o.step).collect(),
                        source,
                    });
                }
            };
            info!(step = %step, "teardown step done");
            done.push(StepOutcome { step, already_gone });
        }
        Ok(done)
    }
}
