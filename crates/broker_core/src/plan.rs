//! The fixed set of database plans and what backs each of them.

use std::fmt;
use std::str::FromStr;

use crate::error::BrokerError;

/// A named tier of database capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Plan {
    Micro,
    Small,
    Medium,
    Large,
}

/// Backing technology of a plan. Decides whether provisioning goes through the
/// availability gate and how the resource is torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backing {
    /// A logical schema on the shared MySQL host.
    SharedTenant,
    /// A provider-managed cluster with a writer and a reader instance.
    DedicatedCluster,
}

impl Plan {
    pub const ALL: [Plan; 4] = [Plan::Micro, Plan::Small, Plan::Medium, Plan::Large];

    pub fn as_str(self) -> &'static str {
        match self {
            Plan::Micro => "micro",
            Plan::Small => "small",
            Plan::Medium => "medium",
            Plan::Large => "large",
        }
    }

    pub fn backing(self) -> Backing {
        match self {
            Plan::Micro | Plan::Small | Plan::Medium => Backing::SharedTenant,
            Plan::Large => Backing::DedicatedCluster,
        }
    }

    pub fn is_dedicated(self) -> bool {
        self.backing() == Backing::DedicatedCluster
    }

    /// Human-readable description served by the plans endpoint.
    pub fn description(self) -> &'static str {
        match self {
            Plan::Micro => "Shared Tenancy",
            Plan::Small => "2x CPU - 4GB Mem - 20GB Disk - Extra IOPS:no",
            Plan::Medium => "2x CPU - 8GB Mem - 50GB Disk - Extra IOPS:no",
            Plan::Large => "4x CPU - 30GB Mem - 100GB Disk - Extra IOPS:1000",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = BrokerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Plan::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| BrokerError::InvalidInput(format!("unknown plan '{s}'")))
    }
}
