use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{Extension, Json};
use broker_core::service::BrokerService;

/// GET /v1/aurora-mysql/plans
pub async fn plans(
    Extension(service): Extension<Arc<dyn BrokerService>>,
) -> Json<BTreeMap<&'static str, &'static str>> {
    Json(
        service
            .plans()
            .into_iter()
            .map(|(plan, description)| (plan.as_str(), description))
            .collect(),
    )
}
