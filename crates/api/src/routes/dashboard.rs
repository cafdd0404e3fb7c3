use axum::{extract::State, Json};

use crate::services::dashboard::{self as dashboard_service, DashboardSummary};
use crate::{ApiError, AppState};

#[utoipa::path(
    get,
    path = "/api/admin/dashboard",
    tag = "Admin",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Headline counts for the admin home page", body = DashboardSummary),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse)
    )
)]
pub async fn dashboard(State(state): State<AppState>) -> Result<Json<DashboardSummary>, ApiError> {
    let summary = dashboard_service::summary(state.db_pool()).await?;
    Ok(Json(summary))
}
