//! In-process ledger store.
//!
//! Backs the unit tests and the router tests. The claim is a
//! conditional update performed under the write lock, so it has the same
//! all-or-nothing behaviour as the Postgres statement.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::plan::Plan;
use crate::ports::{ClaimOutcome, LedgerStore};
use crate::types::{ClaimState, InventoryRecord};

pub struct MemoryLedgerStore {
    inner: RwLock<HashMap<String, InventoryRecord>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Seed a record. Replaces any record with the same name.
    pub fn insert(&self, record: InventoryRecord) -> Result<()> {
        let mut store = self.inner.write().map_err(|e| anyhow!("Lock: {}", e))?;
        store.insert(record.name.clone(), record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn find_oldest_unclaimed(&self, plan: Plan) -> Result<Option<String>> {
        let store = self.inner.read().map_err(|e| anyhow!("Lock: {}", e))?;
        Ok(store
            .values()
            .filter(|r| r.plan == plan && r.claimed == ClaimState::Unclaimed)
            .min_by(|a, b| {
                a.created_at
                    .cmp(&b.created_at)
                    .then_with(|| a.name.cmp(&b.name))
            })
            .map(|r| r.name.clone()))
    }

    async fn claim(&self, name: &str) -> Result<ClaimOutcome> {
        let mut store = self.inner.write().map_err(|e| anyhow!("Lock: {}", e))?;
        match store.get_mut(name) {
            Some(record) if record.claimed == ClaimState::Unclaimed => {
                record.claimed = ClaimState::Claimed;
                Ok(ClaimOutcome::Claimed)
            }
            _ => Ok(ClaimOutcome::Conflict),
        }
    }

    async fn release(&self, name: &str) -> Result<()> {
        let mut store = self.inner.write().map_err(|e| anyhow!("Lock: {}", e))?;
        if let Some(record) = store.get_mut(name) {
            record.claimed = ClaimState::Unclaimed;
        }
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<u64> {
        let mut store = self.inner.write().map_err(|e| anyhow!("Lock: {}", e))?;
        Ok(u64::from(store.remove(name).is_some()))
    }

    async fn get(&self, name: &str) -> Result<Option<InventoryRecord>> {
        let store = self.inner.read().map_err(|e| anyhow!("Lock: {}", e))?;
        Ok(store.get(name).cloned())
    }
}
