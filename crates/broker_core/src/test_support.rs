//! Doubles shared by the unit tests in this crate.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use crate::error::ProviderError;
use crate::plan::Plan;
use crate::ports::{ProviderClient, SharedTenantHost};
use crate::types::{ClaimState, Credentials, InventoryRecord};

/// An unclaimed record created `age_secs` seconds after a fixed epoch.
pub fn record(name: &str, plan: Plan, age_secs: i64) -> InventoryRecord {
    InventoryRecord {
        name: name.to_string(),
        plan,
        claimed: ClaimState::Unclaimed,
        created_at: Utc.timestamp_opt(1_700_000_000 + age_secs, 0).unwrap(),
        credentials: Credentials {
            username: format!("{name}_user"),
            password: format!("{name}_pass"),
            endpoint: format!("{name}.cluster.example:3306"),
            reader_endpoint: format!("{name}.cluster-ro.example:3306"),
        },
    }
}

/// Provider double. Every call is recorded as `<op> <id>`; failures are
/// queued per call key and consumed in order.
#[derive(Default)]
pub struct ScriptedProvider {
    statuses: Mutex<HashMap<String, String>>,
    failures: Mutex<HashMap<String, VecDeque<ProviderError>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_status(&self, cluster: &str, status: &str) {
        self.statuses
            .lock()
            .unwrap()
            .insert(cluster.to_string(), status.to_string());
    }

    /// Make the next call with this key (e.g. `delete-instance db-us-east-1b`) fail.
    pub fn fail_next(&self, call: &str, err: ProviderError) {
        self.failures
            .lock()
            .unwrap()
            .entry(call.to_string())
            .or_default()
            .push_back(err);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record_call(&self, call: String) -> Result<(), ProviderError> {
        self.calls.lock().unwrap().push(call.clone());
        match self
            .failures
            .lock()
            .unwrap()
            .get_mut(&call)
            .and_then(VecDeque::pop_front)
        {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ProviderClient for ScriptedProvider {
    async fn delete_instance(&self, instance_id: &str) -> Result<(), ProviderError> {
        self.record_call(format!("delete-instance {instance_id}"))
    }

    async fn delete_cluster(&self, cluster_id: &str) -> Result<(), ProviderError> {
        self.record_call(format!("delete-cluster {cluster_id}"))
    }

    async fn describe_cluster_status(&self, cluster_id: &str) -> Result<String, ProviderError> {
        self.record_call(format!("describe-cluster {cluster_id}"))?;
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .get(cluster_id)
            .cloned()
            .unwrap_or_else(|| "available".to_string()))
    }

    async fn add_tag(&self, resource_arn: &str, key: &str, value: &str) -> Result<(), ProviderError> {
        self.record_call(format!("add-tag {resource_arn} {key}={value}"))
    }
}

/// Shared-host double that can be told to fail its next drop.
#[derive(Default)]
pub struct ScriptedSharedHost {
    fail_next: Mutex<bool>,
    dropped: Mutex<Vec<String>>,
}

impl ScriptedSharedHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_drop(&self) {
        *self.fail_next.lock().unwrap() = true;
    }

    pub fn dropped(&self) -> Vec<String> {
        self.dropped.lock().unwrap().clone()
    }
}

#[async_trait]
impl SharedTenantHost for ScriptedSharedHost {
    async fn drop_database(&self, name: &str) -> Result<()> {
        let mut fail = self.fail_next.lock().unwrap();
        if *fail {
            *fail = false;
            return Err(anyhow!("Lost connection to MySQL server during query"));
        }
        self.dropped.lock().unwrap().push(name.to_string());
        Ok(())
    }
}
