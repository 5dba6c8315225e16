use std::sync::Arc;

use axum::{extract::rejection::JsonRejection, Extension, Json};
use broker_core::service::{BrokerService, TagRequest};
use serde::Deserialize;
use serde_json::{json, Value};

use super::json_body;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct TagBody {
    pub resource: String,
    pub name: String,
    pub value: String,
}

/// POST /v1/tag
pub async fn tag(
    Extension(service): Extension<Arc<dyn BrokerService>>,
    body: Result<Json<TagBody>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let body = json_body(body)?;
    service
        .tag(TagRequest {
            resource: body.resource,
            key: body.name,
            value: body.value,
        })
        .await?;
    Ok(Json(json!({ "response": "tag added" })))
}
