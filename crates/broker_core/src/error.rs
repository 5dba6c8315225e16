use thiserror::Error;

use crate::lifecycle::TeardownStep;
use crate::plan::Plan;

/// Classified outcome of a failed provider call.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("{resource} is already being deleted")]
    AlreadyDeleting { resource: String },

    /// Network failure, timeout or throttling. Retrying the outer operation is safe.
    #[error("provider unavailable: {0}")]
    Transient(String),

    #[error("provider rejected request: {0}")]
    Fatal(String),
}

impl ProviderError {
    /// True when the resource is gone or on its way out, which teardown treats
    /// as success.
    pub fn is_already_gone(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::AlreadyDeleting { .. })
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("no unclaimed '{plan}' databases remain in the pool")]
    PoolExhausted { plan: Plan },

    #[error("cluster {name} is not available (status: {status})")]
    ClusterUnavailable { name: String, status: String },

    #[error("gave up claiming a '{plan}' database after {attempts} contended attempts")]
    ClaimContention { plan: Plan, attempts: u32 },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("teardown of {name} stopped at {step} after {} completed step(s): {source}", .completed.len())]
    PartialTeardown {
        name: String,
        step: TeardownStep,
        completed: Vec<TeardownStep>,
        #[source]
        source: ProviderError,
    },

    #[error("shared host: {0}")]
    SharedHost(#[source] anyhow::Error),

    #[error("ledger: {0}")]
    Ledger(#[source] anyhow::Error),
}

impl BrokerError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::NotFound(_) => 404,
            Self::PoolExhausted { .. } => 503,
            Self::ClusterUnavailable { .. } => 503,
            Self::ClaimContention { .. } => 503,
            Self::Provider(e) if e.is_transient() => 503,
            Self::Provider(_) => 502,
            Self::PartialTeardown { .. } => 502,
            Self::SharedHost(_) => 500,
            Self::Ledger(_) => 500,
        }
    }

    /// Expected "come back later" states that carry empty connection URLs
    /// instead of an error body.
    pub fn unavailable_reason(&self) -> Option<&'static str> {
        match self {
            Self::PoolExhausted { .. } => Some("pool_exhausted"),
            Self::ClusterUnavailable { .. } => Some("cluster_unavailable"),
            _ => None,
        }
    }
}
