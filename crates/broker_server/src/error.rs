//! Maps broker errors onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use broker_core::BrokerError;
use serde_json::json;
use tracing::{error, warn};

#[derive(Debug)]
pub enum AppError {
    Broker(BrokerError),
    /// Failures outside the broker taxonomy, e.g. a panicked worker task.
    Internal(anyhow::Error),
}

impl From<BrokerError> for AppError {
    fn from(err: BrokerError) -> Self {
        Self::Broker(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let err = match self {
            Self::Broker(err) => err,
            Self::Internal(err) => {
                error!(error = %err, "internal error");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": err.to_string() })),
                )
                    .into_response();
            }
        };

        let status =
            StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let message = err.to_string();

        if let Some(reason) = err.unavailable_reason() {
            warn!(reason, error = %message, "request could not be served right now");
            return (
                status,
                Json(json!({
                    "DATABASE_URL": "",
                    "DATABASE_READONLY_URL": "",
                    "reason": reason,
                    "error": message,
                })),
            )
                .into_response();
        }

        if status.is_server_error() {
            error!(status = status.as_u16(), error = %message, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %message, "request rejected");
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}
