//! Credential Composer: formats connection URLs from stored fields.

use std::fmt;

use crate::error::BrokerError;
use crate::ports::LedgerStore;
use crate::types::Credentials;
use crate::Result;

#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionUrls {
    pub primary: String,
    pub read_only: String,
}

impl ConnectionUrls {
    /// `<user>:<pass>@<endpoint>` for the writer and the reader endpoint.
    pub fn from_credentials(creds: &Credentials) -> Self {
        let auth = format!("{}:{}", creds.username, creds.password);
        Self {
            primary: format!("{auth}@{}", creds.endpoint),
            read_only: format!("{auth}@{}", creds.reader_endpoint),
        }
    }
}

impl fmt::Debug for ConnectionUrls {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionUrls").finish_non_exhaustive()
    }
}

/// Read the stored credentials of `name` and compose its URLs. No side effects.
pub async fn compose_urls(ledger: &dyn LedgerStore, name: &str) -> Result<ConnectionUrls> {
    let record = ledger
        .get(name)
        .await
        .map_err(BrokerError::Ledger)?
        .ok_or_else(|| BrokerError::NotFound(format!("database '{name}'")))?;
    Ok(ConnectionUrls::from_credentials(&record.credentials))
}
