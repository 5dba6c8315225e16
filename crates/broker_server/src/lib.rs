//! broker_server: HTTP surface of the database broker.

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
