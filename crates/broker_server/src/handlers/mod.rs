pub mod health;
pub mod instance;
pub mod plans;
pub mod tag;

use std::future::Future;

use anyhow::anyhow;
use axum::extract::rejection::JsonRejection;
use axum::Json;
use broker_core::BrokerError;

use crate::error::AppError;

/// Run a broker operation on its own task and wait for it.
///
/// axum drops the handler future when the client disconnects; spawning keeps
/// claims and teardowns running to completion regardless.
pub(crate) async fn run_to_completion<T, F>(op: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, BrokerError>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(op)
        .await
        .map_err(|e| AppError::Internal(anyhow!("broker task failed: {e}")))?
        .map_err(AppError::from)
}

/// Unwrap a JSON body, turning a malformed request into a 400 with an error payload.
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(v)| v)
        .map_err(|e| BrokerError::InvalidInput(e.body_text()).into())
}
