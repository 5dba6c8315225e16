//! Availability Gate for dedicated-cluster plans.
//!
//! Runs after the claim. A cluster that is not serving sends the record back
//! to the pool before the failure is reported, so no claimed-but-unusable
//! record is left behind.

use std::sync::Arc;

use anyhow::anyhow;
use tracing::{error, info, warn};

use crate::error::BrokerError;
use crate::ports::{LedgerStore, ProviderClient};
use crate::Result;

/// The only cluster status that counts as ready.
pub const READY_STATUS: &str = "available";

pub struct AvailabilityGate {
    ledger: Arc<dyn LedgerStore>,
    provider: Arc<dyn ProviderClient>,
}

impl AvailabilityGate {
    pub fn new(ledger: Arc<dyn LedgerStore>, provider: Arc<dyn ProviderClient>) -> Self {
        Self { ledger, provider }
    }

    /// Confirm the claimed cluster `name` is serving, or release the claim.
    pub async fn confirm_or_release(&self, name: &str) -> Result<()> {
        let failure = match self.provider.describe_cluster_status(name).await {
            Ok(status) if status == READY_STATUS => return Ok(()),
            Ok(status) => BrokerError::ClusterUnavailable {
                name: name.to_string(),
                status,
            },
            Err(e) => BrokerError::Provider(e),
        };

        warn!(name = %name, error = %failure, "cluster not ready, releasing claim");
        if let Err(e) = self.ledger.release(name).await {
            error!(name = %name, error = %e, "failed to release claim on unavailable cluster");
            return Err(BrokerError::Ledger(anyhow!(
                "releasing {name} after failed availability check ({failure}): {e}"
            )));
        }
        info!(name = %name, "claim released back to pool");
        Err(failure)
    }
}
