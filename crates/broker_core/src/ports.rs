//! Port traits the broker core is written against.
//!
//! Adapters live in `broker_postgres` (ledger, shared host) and `broker_aws`
//! (provider). Ledger and shared-host failures are opaque `anyhow` errors;
//! provider failures are classified because teardown and the availability
//! gate branch on them.

use anyhow::Result;
use async_trait::async_trait;

use crate::error::ProviderError;
use crate::plan::Plan;
use crate::types::InventoryRecord;

/// Result of a conditional claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    Claimed,
    /// The record was no longer unclaimed when the update ran.
    Conflict,
}

/// The ledger of inventory records. Single source of truth for claim state.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Name of the unclaimed record with the smallest creation time for `plan`.
    async fn find_oldest_unclaimed(&self, plan: Plan) -> Result<Option<String>>;

    /// Atomically move `name` from unclaimed to claimed. Must be a single
    /// conditional update, never a read followed by a write.
    async fn claim(&self, name: &str) -> Result<ClaimOutcome>;

    /// Return a claimed record to the pool. No-op if it is not claimed.
    async fn release(&self, name: &str) -> Result<()>;

    /// Delete the row. Returns rows affected.
    async fn remove(&self, name: &str) -> Result<u64>;

    async fn get(&self, name: &str) -> Result<Option<InventoryRecord>>;
}

/// Cloud database-service capabilities the broker needs.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    async fn delete_instance(&self, instance_id: &str) -> Result<(), ProviderError>;

    async fn delete_cluster(&self, cluster_id: &str) -> Result<(), ProviderError>;

    /// Raw status string of the cluster, e.g. `available` or `creating`.
    async fn describe_cluster_status(&self, cluster_id: &str) -> Result<String, ProviderError>;

    async fn add_tag(&self, resource_arn: &str, key: &str, value: &str)
        -> Result<(), ProviderError>;
}

/// The shared multi-tenant host backing shared-tenant plans.
#[async_trait]
pub trait SharedTenantHost: Send + Sync {
    /// Drop the tenant's schema. Dropping an absent schema succeeds.
    async fn drop_database(&self, name: &str) -> Result<()>;
}
