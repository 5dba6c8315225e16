//! Database instance handlers.
//!
//! POST   /v1/aurora-mysql/instance        - claim a pooled database
//! DELETE /v1/aurora-mysql/instance/:name  - tear down a claimed database
//! GET    /v1/aurora-mysql/url/:name       - connection URLs of a database

use std::sync::Arc;

use axum::{extract::rejection::JsonRejection, extract::Path, Extension, Json};
use broker_core::credentials::ConnectionUrls;
use broker_core::service::{BrokerService, ProvisionRequest};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{json_body, run_to_completion};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct ProvisionBody {
    pub plan: String,
    #[serde(default)]
    pub billingcode: String,
}

#[derive(Debug, Serialize)]
pub struct UrlsResponse {
    #[serde(rename = "DATABASE_URL")]
    pub database_url: String,
    #[serde(rename = "DATABASE_READONLY_URL")]
    pub database_readonly_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl From<ConnectionUrls> for UrlsResponse {
    fn from(urls: ConnectionUrls) -> Self {
        Self {
            database_url: urls.primary,
            database_readonly_url: urls.read_only,
            warning: None,
        }
    }
}

pub async fn provision(
    Extension(service): Extension<Arc<dyn BrokerService>>,
    body: Result<Json<ProvisionBody>, JsonRejection>,
) -> Result<Json<UrlsResponse>, AppError> {
    let body = json_body(body)?;
    let req = ProvisionRequest {
        plan: body.plan,
        billing_code: body.billingcode,
    };
    let provisioned = run_to_completion(async move { service.provision(req).await }).await?;
    Ok(Json(UrlsResponse {
        warning: provisioned.tag_warning,
        ..UrlsResponse::from(provisioned.urls)
    }))
}

pub async fn delete(
    Extension(service): Extension<Arc<dyn BrokerService>>,
    Path(name): Path<String>,
) -> Result<Json<Value>, AppError> {
    run_to_completion(async move { service.deprovision(&name).await }).await?;
    Ok(Json(json!({ "status": "deleted" })))
}

pub async fn url(
    Extension(service): Extension<Arc<dyn BrokerService>>,
    Path(name): Path<String>,
) -> Result<Json<UrlsResponse>, AppError> {
    let urls = service.lookup_urls(&name).await?;
    Ok(Json(urls.into()))
}
