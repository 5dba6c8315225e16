//! Pool Allocator: hands out the oldest unclaimed record of a plan.
//!
//! Correctness under concurrent requests rests entirely on the ledger's
//! conditional claim: a requester that loses the race for a record sees
//! `Conflict` and selects again, falling over to the next-oldest record.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::BrokerError;
use crate::plan::Plan;
use crate::ports::{ClaimOutcome, LedgerStore};
use crate::Result;

pub const DEFAULT_MAX_CLAIM_ATTEMPTS: u32 = 8;

pub struct PoolAllocator {
    ledger: Arc<dyn LedgerStore>,
    max_attempts: u32,
}

impl PoolAllocator {
    pub fn new(ledger: Arc<dyn LedgerStore>, max_attempts: u32) -> Self {
        Self {
            ledger,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Claim the oldest unclaimed record for `plan` and return its name.
    pub async fn claim_oldest(&self, plan: Plan) -> Result<String> {
        for attempt in 1..=self.max_attempts {
            let Some(name) = self
                .ledger
                .find_oldest_unclaimed(plan)
                .await
                .map_err(BrokerError::Ledger)?
            else {
                info!(%plan, "pool exhausted");
                return Err(BrokerError::PoolExhausted { plan });
            };

            match self.ledger.claim(&name).await.map_err(BrokerError::Ledger)? {
                ClaimOutcome::Claimed => {
                    info!(%plan, name = %name, attempt, "claimed pooled database");
                    return Ok(name);
                }
                ClaimOutcome::Conflict => {
                    debug!(%plan, name = %name, attempt, "lost claim race, reselecting");
                }
            }
        }

        warn!(%plan, attempts = self.max_attempts, "claim attempts exhausted under contention");
        Err(BrokerError::ClaimContention {
            plan,
            attempts: self.max_attempts,
        })
    }
}
