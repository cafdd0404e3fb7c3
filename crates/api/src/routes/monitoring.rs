use axum::{
    extract::{Query, State},
    Json,
};
use pharmacy_monitoring::{Alert, SystemMetrics, MAX_RECENT_ALERTS};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::AppState;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AlertQuery {
    /// Defaults to 20, at most 100.
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AlertsResponse {
    pub alerts: Vec<Alert>,
}

#[utoipa::path(
    get,
    path = "/api/monitoring/metrics",
    tag = "Monitoring",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Latest metrics; collected on demand before the first scheduled tick", body = SystemMetrics),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse)
    )
)]
pub async fn metrics(State(state): State<AppState>) -> Json<SystemMetrics> {
    let metrics = match state.monitor().latest().await {
        Some(metrics) => metrics,
        None => state.monitor().tick(state.db_pool()).await,
    };
    Json(metrics)
}

#[utoipa::path(
    get,
    path = "/api/monitoring/alerts",
    tag = "Monitoring",
    security(("bearerAuth" = [])),
    params(AlertQuery),
    responses(
        (status = 200, description = "Recent threshold alerts, newest first", body = AlertsResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse)
    )
)]
pub async fn alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertQuery>,
) -> Json<AlertsResponse> {
    let limit = query.limit.unwrap_or(20).clamp(1, MAX_RECENT_ALERTS);
    Json(AlertsResponse {
        alerts: state.monitor().recent_alerts(limit).await,
    })
}
