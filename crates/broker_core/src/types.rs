use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BrokerError;
use crate::plan::Plan;

/// Longest resource name accepted; matches the RDS identifier limit.
pub const MAX_NAME_LEN: usize = 63;

/// Claim state of an inventory record. There is no tombstone: deletion
/// removes the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimState {
    Unclaimed,
    Claimed,
}

impl ClaimState {
    /// Value stored in the ledger's `claimed` column.
    pub fn as_column(self) -> &'static str {
        match self {
            ClaimState::Unclaimed => "no",
            ClaimState::Claimed => "yes",
        }
    }

    pub fn from_column(value: &str) -> Option<Self> {
        match value {
            "no" => Some(ClaimState::Unclaimed),
            "yes" => Some(ClaimState::Claimed),
            _ => None,
        }
    }
}

/// Connection fields seeded alongside the inventory record. Immutable once
/// seeded.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub endpoint: String,
    pub reader_endpoint: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("reader_endpoint", &self.reader_endpoint)
            .finish()
    }
}

/// One pre-provisioned database in the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryRecord {
    /// Unique key, also the external resource identifier.
    pub name: String,
    pub plan: Plan,
    pub claimed: ClaimState,
    /// Selection tie-break: the oldest unclaimed record is handed out first.
    pub created_at: DateTime<Utc>,
    pub credentials: Credentials,
}

impl InventoryRecord {
    pub fn is_claimed(&self) -> bool {
        self.claimed == ClaimState::Claimed
    }
}

/// Reject names that are not usable as both an RDS identifier and a MySQL
/// schema name.
pub fn validate_resource_name(name: &str) -> Result<(), BrokerError> {
    if name.is_empty() {
        return Err(BrokerError::InvalidInput("resource name is empty".into()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(BrokerError::InvalidInput(format!(
            "resource name exceeds {MAX_NAME_LEN} characters"
        )));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(BrokerError::InvalidInput(format!(
            "resource name '{name}' contains invalid character '{bad}'"
        )));
    }
    Ok(())
}
