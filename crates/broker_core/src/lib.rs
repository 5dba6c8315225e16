//! broker_core: the pool allocation and resource-lifecycle engine of the
//! database broker.
//!
//! Pure domain logic. Storage and the cloud provider are reached only through
//! the port traits in [`ports`], so the same code runs against Postgres + RDS
//! in production and against in-memory doubles in tests.

pub mod allocator;
pub mod arn;
pub mod credentials;
pub mod error;
pub mod gate;
pub mod lifecycle;
pub mod memory;
pub mod plan;
pub mod ports;
pub mod service;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{BrokerError, ProviderError};
pub use plan::{Backing, Plan};
pub use service::{BrokerService, BrokerServiceImpl, BrokerSettings};

pub type Result<T> = std::result::Result<T, BrokerError>;
