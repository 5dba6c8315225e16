//! Router construction for the broker server.

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Extension, Router,
};
use broker_core::service::BrokerService;
use tower_http::trace::TraceLayer;

use crate::handlers;

/// Build the full axum router with all routes and middleware.
pub fn build_router(service: Arc<dyn BrokerService>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route(
            "/v1/aurora-mysql/instance",
            post(handlers::instance::provision),
        )
        .route(
            "/v1/aurora-mysql/instance/:name",
            delete(handlers::instance::delete),
        )
        .route("/v1/aurora-mysql/plans", get(handlers::plans::plans))
        .route("/v1/aurora-mysql/url/:name", get(handlers::instance::url))
        .route("/v1/tag", post(handlers::tag::tag))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(service))
}
