//! broker_aws: Provider Client over the AWS RDS API.
//!
//! One `aws_sdk_rds::Client` is built at start-up with an explicit operation
//! timeout and shared by all requests. SDK failures are classified into
//! [`ProviderError`] so teardown can tell "already gone" from real failures.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::timeout::TimeoutConfig;
use aws_sdk_rds::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_rds::types::Tag;
use aws_sdk_rds::Client as RdsClient;
use tracing::{debug, instrument};

use broker_core::ports::ProviderClient;
use broker_core::ProviderError;

/// Error codes meaning the addressed resource does not exist.
const NOT_FOUND_CODES: &[&str] = &[
    "DBInstanceNotFound",
    "DBInstanceNotFoundFault",
    "DBClusterNotFoundFault",
];

/// Error codes returned when the resource is already being deleted.
const INVALID_STATE_CODES: &[&str] = &[
    "InvalidDBInstanceState",
    "InvalidDBInstanceStateFault",
    "InvalidDBClusterStateFault",
];

/// Error codes worth retrying.
const THROTTLING_CODES: &[&str] = &["Throttling", "ThrottlingException", "RequestLimitExceeded"];

#[derive(Debug, Clone)]
pub struct RdsProviderConfig {
    pub region: String,
    /// Overrides the RDS endpoint, for local API emulators.
    pub endpoint_url: Option<String>,
    pub operation_timeout: Duration,
}

impl RdsProviderConfig {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            endpoint_url: None,
            operation_timeout: Duration::from_secs(30),
        }
    }
}

/// RDS-backed Provider Client.
#[derive(Clone, Debug)]
pub struct RdsProvider {
    client: RdsClient,
}

impl RdsProvider {
    /// Build the client from the default credential chain.
    #[instrument(skip(config), fields(region = %config.region))]
    pub async fn new(config: &RdsProviderConfig) -> Self {
        let timeouts = TimeoutConfig::builder()
            .operation_timeout(config.operation_timeout)
            .build();
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()))
            .timeout_config(timeouts);
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;
        debug!("RDS client initialized");
        Self {
            client: RdsClient::new(&sdk_config),
        }
    }

    pub fn from_client(client: RdsClient) -> Self {
        Self { client }
    }
}

/// Classify an SDK failure for `resource`.
fn classify<E, R>(resource: &str, err: SdkError<E, R>) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            ProviderError::Transient(format!("{resource}: {err}"))
        }
        SdkError::ServiceError(service) => {
            let inner = service.err();
            let code = inner.code().unwrap_or("unknown");
            let message = inner.message().unwrap_or("no message");
            classify_code(resource, code, message)
        }
        _ => ProviderError::Fatal(format!("{resource}: {err}")),
    }
}

fn classify_code(resource: &str, code: &str, message: &str) -> ProviderError {
    if NOT_FOUND_CODES.contains(&code) {
        ProviderError::NotFound {
            resource: resource.to_string(),
        }
    } else if INVALID_STATE_CODES.contains(&code) && is_deleting_message(message) {
        ProviderError::AlreadyDeleting {
            resource: resource.to_string(),
        }
    } else if THROTTLING_CODES.contains(&code) {
        ProviderError::Transient(format!("{resource}: {code}: {message}"))
    } else {
        ProviderError::Fatal(format!("{resource}: {code}: {message}"))
    }
}

/// RDS reports an in-flight delete as "... is already being deleted". Other
/// invalid-state refusals mention "non-deleting state" and must not match.
fn is_deleting_message(message: &str) -> bool {
    message.to_ascii_lowercase().contains("being deleted")
}

#[async_trait]
impl ProviderClient for RdsProvider {
    #[instrument(skip(self))]
    async fn delete_instance(&self, instance_id: &str) -> Result<(), ProviderError> {
        self.client
            .delete_db_instance()
            .db_instance_identifier(instance_id)
            .skip_final_snapshot(true)
            .send()
            .await
            .map_err(|e| classify(instance_id, e))?;
        debug!("delete-instance accepted");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_cluster(&self, cluster_id: &str) -> Result<(), ProviderError> {
        self.client
            .delete_db_cluster()
            .db_cluster_identifier(cluster_id)
            .skip_final_snapshot(true)
            .send()
            .await
            .map_err(|e| classify(cluster_id, e))?;
        debug!("delete-cluster accepted");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn describe_cluster_status(&self, cluster_id: &str) -> Result<String, ProviderError> {
        let output = self
            .client
            .describe_db_clusters()
            .db_cluster_identifier(cluster_id)
            .max_records(20)
            .send()
            .await
            .map_err(|e| classify(cluster_id, e))?;
        let status = output
            .db_clusters()
            .first()
            .and_then(|c| c.status())
            .ok_or_else(|| ProviderError::NotFound {
                resource: cluster_id.to_string(),
            })?;
        debug!(status = %status, "cluster status");
        Ok(status.to_string())
    }

    #[instrument(skip(self))]
    async fn add_tag(
        &self,
        resource_arn: &str,
        key: &str,
        value: &str,
    ) -> Result<(), ProviderError> {
        self.client
            .add_tags_to_resource()
            .resource_name(resource_arn)
            .tags(Tag::builder().key(key).value(value).build())
            .send()
            .await
            .map_err(|e| classify(resource_arn, e))?;
        Ok(())
    }
}
