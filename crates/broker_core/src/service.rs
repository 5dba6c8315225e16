//! BrokerService: the single service interface the HTTP layer talks to.
//!
//! `BrokerServiceImpl` is assembled from `Arc<dyn Port>` handles built once at
//! start-up, so the same logic runs against Postgres + RDS or test doubles.

use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::{
    allocator::{PoolAllocator, DEFAULT_MAX_CLAIM_ATTEMPTS},
    arn::{resource_arn, ResourceKind},
    credentials::{compose_urls, ConnectionUrls},
    error::BrokerError,
    gate::AvailabilityGate,
    lifecycle::{Deprovisioner, DeprovisionOutcome},
    plan::Plan,
    ports::{LedgerStore, ProviderClient, SharedTenantHost},
    types::validate_resource_name,
    Result,
};

/// Tag key written on dedicated clusters at provision time.
pub const BILLING_TAG_KEY: &str = "billingcode";

#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    pub plan: String,
    pub billing_code: String,
}

#[derive(Debug, Clone)]
pub struct Provisioned {
    pub name: String,
    pub plan: Plan,
    pub urls: ConnectionUrls,
    /// Set when best-effort billing tagging failed; the claim still stands.
    pub tag_warning: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TagRequest {
    pub resource: String,
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct BrokerSettings {
    pub region: String,
    pub account_number: String,
    pub max_claim_attempts: u32,
}

impl BrokerSettings {
    pub fn new(region: impl Into<String>, account_number: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            account_number: account_number.into(),
            max_claim_attempts: DEFAULT_MAX_CLAIM_ATTEMPTS,
        }
    }

    pub fn arn(&self, kind: ResourceKind, name: &str) -> String {
        resource_arn(&self.region, &self.account_number, kind, name)
    }
}

#[async_trait]
pub trait BrokerService: Send + Sync {
    /// Claim a database of the requested plan and return its connection URLs.
    async fn provision(&self, req: ProvisionRequest) -> Result<Provisioned>;

    /// Tear down a claimed database and remove it from the ledger.
    async fn deprovision(&self, name: &str) -> Result<DeprovisionOutcome>;

    async fn lookup_urls(&self, name: &str) -> Result<ConnectionUrls>;

    /// Attach a key/value tag to a database instance. No ledger interaction.
    async fn tag(&self, req: TagRequest) -> Result<()>;

    /// Plan identifiers with their descriptions.
    fn plans(&self) -> Vec<(Plan, &'static str)> {
        Plan::ALL.into_iter().map(|p| (p, p.description())).collect()
    }
}

pub struct BrokerServiceImpl {
    ledger: Arc<dyn LedgerStore>,
    provider: Arc<dyn ProviderClient>,
    allocator: PoolAllocator,
    gate: AvailabilityGate,
    deprovisioner: Deprovisioner,
    settings: BrokerSettings,
}

impl BrokerServiceImpl {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        provider: Arc<dyn ProviderClient>,
        shared_host: Arc<dyn SharedTenantHost>,
        settings: BrokerSettings,
    ) -> Self {
        Self {
            allocator: PoolAllocator::new(Arc::clone(&ledger), settings.max_claim_attempts),
            gate: AvailabilityGate::new(Arc::clone(&ledger), Arc::clone(&provider)),
            deprovisioner: Deprovisioner::new(
                Arc::clone(&ledger),
                Arc::clone(&provider),
                shared_host,
                settings.region.clone(),
            ),
            ledger,
            provider,
            settings,
        }
    }

    /// Send a claimed record back to the pool after a later provisioning step
    /// failed, returning the error to report.
    async fn release_after_failure(&self, name: &str, failure: BrokerError) -> BrokerError {
        warn!(name = %name, error = %failure, "provisioning failed after claim, releasing");
        match self.ledger.release(name).await {
            Ok(()) => failure,
            Err(e) => {
                error!(name = %name, error = %e, "failed to release claim after provisioning error");
                BrokerError::Ledger(anyhow!(
                    "releasing {name} after failed provisioning ({failure}): {e}"
                ))
            }
        }
    }

    async fn tag_billing_code(&self, name: &str, billing_code: &str) -> Option<String> {
        let arn = self.settings.arn(ResourceKind::Cluster, name);
        match self
            .provider
            .add_tag(&arn, BILLING_TAG_KEY, billing_code)
            .await
        {
            Ok(()) => None,
            Err(e) => {
                warn!(name = %name, arn = %arn, error = %e, "billing tag failed, claim kept");
                Some(format!("billing tag not applied: {e}"))
            }
        }
    }
}

#[async_trait]
impl BrokerService for BrokerServiceImpl {
    async fn provision(&self, req: ProvisionRequest) -> Result<Provisioned> {
        let plan: Plan = req.plan.parse()?;
        let name = self.allocator.claim_oldest(plan).await?;

        let mut tag_warning = None;
        if plan.is_dedicated() {
            self.gate.confirm_or_release(&name).await?;
            tag_warning = self.tag_billing_code(&name, &req.billing_code).await;
        }

        let urls = match compose_urls(self.ledger.as_ref(), &name).await {
            Ok(urls) => urls,
            Err(failure) => return Err(self.release_after_failure(&name, failure).await),
        };
        info!(name = %name, plan = %plan, "database provisioned");
        Ok(Provisioned {
            name,
            plan,
            urls,
            tag_warning,
        })
    }

    async fn deprovision(&self, name: &str) -> Result<DeprovisionOutcome> {
        validate_resource_name(name)?;
        self.deprovisioner.deprovision(name).await
    }

    async fn lookup_urls(&self, name: &str) -> Result<ConnectionUrls> {
        validate_resource_name(name)?;
        let record = self
            .ledger
            .get(name)
            .await
            .map_err(BrokerError::Ledger)?
            .filter(|r| r.is_claimed())
            .ok_or_else(|| BrokerError::NotFound(format!("claimed database '{name}'")))?;
        Ok(ConnectionUrls::from_credentials(&record.credentials))
    }

    async fn tag(&self, req: TagRequest) -> Result<()> {
        validate_resource_name(&req.resource)?;
        if req.key.is_empty() {
            return Err(BrokerError::InvalidInput("tag key is empty".into()));
        }
        let arn = self.settings.arn(ResourceKind::Db, &req.resource);
        self.provider.add_tag(&arn, &req.key, &req.value).await?;
        info!(arn = %arn, key = %req.key, "tag added");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::error::ProviderError;
    use crate::memory::MemoryLedgerStore;
    use crate::ports::ClaimOutcome;
    use crate::test_support::{record, ScriptedProvider, ScriptedSharedHost};
    use crate::types::{ClaimState, InventoryRecord};

    /// Memory ledger whose first `get` fails, as on a dropped connection.
    struct FlakyReadLedger {
        inner: MemoryLedgerStore,
        fail_get: AtomicBool,
    }

    #[async_trait]
    impl LedgerStore for FlakyReadLedger {
        async fn find_oldest_unclaimed(&self, plan: Plan) -> anyhow::Result<Option<String>> {
            self.inner.find_oldest_unclaimed(plan).await
        }

        async fn claim(&self, name: &str) -> anyhow::Result<ClaimOutcome> {
            self.inner.claim(name).await
        }

        async fn release(&self, name: &str) -> anyhow::Result<()> {
            self.inner.release(name).await
        }

        async fn remove(&self, name: &str) -> anyhow::Result<u64> {
            self.inner.remove(name).await
        }

        async fn get(&self, name: &str) -> anyhow::Result<Option<InventoryRecord>> {
            if self.fail_get.swap(false, Ordering::SeqCst) {
                anyhow::bail!("connection reset");
            }
            self.inner.get(name).await
        }
    }

    struct Fixture {
        ledger: Arc<MemoryLedgerStore>,
        provider: Arc<ScriptedProvider>,
        service: BrokerServiceImpl,
    }

    fn fixture() -> Fixture {
        let ledger = Arc::new(MemoryLedgerStore::new());
        let provider = Arc::new(ScriptedProvider::new());
        let service = BrokerServiceImpl::new(
            ledger.clone(),
            provider.clone(),
            Arc::new(ScriptedSharedHost::new()),
            BrokerSettings::new("us-east-1", "123456789012"),
        );
        Fixture {
            ledger,
            provider,
            service,
        }
    }

    fn request(plan: &str) -> ProvisionRequest {
        ProvisionRequest {
            plan: plan.into(),
            billing_code: "ACME-001".into(),
        }
    }

    #[tokio::test]
    async fn large_plan_claims_oldest_and_tags_cluster() {
        let f = fixture();
        f.ledger.insert(record("t2", Plan::Large, 2)).unwrap();
        f.ledger.insert(record("t1", Plan::Large, 1)).unwrap();

        let out = f.service.provision(request("large")).await.unwrap();
        assert_eq!(out.name, "t1");
        assert_eq!(out.urls.primary, "t1_user:t1_pass@t1.cluster.example:3306");
        assert!(out.tag_warning.is_none());
        assert_eq!(
            f.provider.calls(),
            vec![
                "describe-cluster t1",
                "add-tag arn:aws:rds:us-east-1:123456789012:cluster:t1 billingcode=ACME-001",
            ]
        );
    }

    #[tokio::test]
    async fn shared_plan_skips_gate_and_tagging() {
        let f = fixture();
        f.ledger.insert(record("tiny", Plan::Micro, 0)).unwrap();

        f.service.provision(request("micro")).await.unwrap();
        assert!(f.provider.calls().is_empty());
    }

    #[tokio::test]
    async fn unknown_plan_never_touches_ledger() {
        let f = fixture();
        f.ledger.insert(record("big", Plan::Large, 0)).unwrap();

        let err = f.service.provision(request("huge")).await.unwrap_err();
        assert!(matches!(err, BrokerError::InvalidInput(_)));
        let rec = f.ledger.get("big").await.unwrap().unwrap();
        assert_eq!(rec.claimed, ClaimState::Unclaimed);
    }

    #[tokio::test]
    async fn tagging_failure_does_not_roll_back_claim() {
        let f = fixture();
        f.ledger.insert(record("big", Plan::Large, 0)).unwrap();
        f.provider.fail_next(
            "add-tag arn:aws:rds:us-east-1:123456789012:cluster:big billingcode=ACME-001",
            ProviderError::Fatal("AccessDenied".into()),
        );

        let out = f.service.provision(request("large")).await.unwrap();
        assert!(out.tag_warning.is_some());
        let rec = f.ledger.get("big").await.unwrap().unwrap();
        assert_eq!(rec.claimed, ClaimState::Claimed);
    }

    #[tokio::test]
    async fn unavailable_cluster_is_released_and_reported() {
        let f = fixture();
        f.ledger.insert(record("big", Plan::Large, 0)).unwrap();
        f.provider.set_status("big", "modifying");

        let err = f.service.provision(request("large")).await.unwrap_err();
        assert_eq!(err.unavailable_reason(), Some("cluster_unavailable"));
        let rec = f.ledger.get("big").await.unwrap().unwrap();
        assert_eq!(rec.claimed, ClaimState::Unclaimed);
    }

    #[tokio::test]
    async fn tag_uses_db_arn_once() {
        let f = fixture();
        f.service
            .tag(TagRequest {
                resource: "mydb-1".into(),
                key: "billingcode".into(),
                value: "ACME-001".into(),
            })
            .await
            .unwrap();
        assert_eq!(
            f.provider.calls(),
            vec!["add-tag arn:aws:rds:us-east-1:123456789012:db:mydb-1 billingcode=ACME-001"]
        );
    }

    #[tokio::test]
    async fn tag_rejects_malformed_resource() {
        let f = fixture();
        let err = f
            .service
            .tag(TagRequest {
                resource: "a'b".into(),
                key: "k".into(),
                value: "v".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::InvalidInput(_)));
        assert!(f.provider.calls().is_empty());
    }

    #[tokio::test]
    async fn credential_read_failure_releases_claim() {
        let ledger = Arc::new(FlakyReadLedger {
            inner: MemoryLedgerStore::new(),
            fail_get: AtomicBool::new(true),
        });
        ledger.inner.insert(record("tiny", Plan::Micro, 0)).unwrap();
        let service = BrokerServiceImpl::new(
            ledger.clone(),
            Arc::new(ScriptedProvider::new()),
            Arc::new(ScriptedSharedHost::new()),
            BrokerSettings::new("us-east-1", "123456789012"),
        );

        let err = service.provision(request("micro")).await.unwrap_err();
        assert!(matches!(err, BrokerError::Ledger(_)));
        let rec = ledger.inner.get("tiny").await.unwrap().unwrap();
        assert_eq!(rec.claimed, ClaimState::Unclaimed);

        let out = service.provision(request("micro")).await.unwrap();
        assert_eq!(out.name, "tiny");
    }

    #[tokio::test]
    async fn lookup_urls_hides_pooled_records() {
        let f = fixture();
        f.ledger.insert(record("pooled", Plan::Small, 0)).unwrap();

        let err = f.service.lookup_urls("pooled").await.unwrap_err();
        assert_eq!(err.http_status(), 404);

        f.ledger.claim("pooled").await.unwrap();
        let urls = f.service.lookup_urls("pooled").await.unwrap();
        assert_eq!(urls.primary, "pooled_user:pooled_pass@pooled.cluster.example:3306");
    }

    #[tokio::test]
    async fn lookup_urls_for_missing_name() {
        let f = fixture();
        let err = f.service.lookup_urls("ghost").await.unwrap_err();
        assert_eq!(err.http_status(), 404);
    }

    #[test]
    fn plans_lists_all_four() {
        let f = fixture();
        let plans = f.service.plans();
        assert_eq!(plans.len(), 4);
        assert!(plans.contains(&(Plan::Micro, "Shared Tenancy")));
    }
}
