use axum::{
    extract::{Path, Query, State},
    Json,
};
use pharmacy_database::{Prescription, PrescriptionKind, PrescriptionStatus};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::util::Pagination;
use crate::{ApiError, AppState};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PrescriptionFilter {
    pub kind: Option<PrescriptionKind>,
    pub status: Option<PrescriptionStatus>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PrescriptionsResponse {
    pub prescriptions: Vec<Prescription>,
    pub page: u32,
    pub per_page: u32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePrescriptionStatusRequest {
    pub status: PrescriptionStatus,
}

#[utoipa::path(
    get,
    path = "/api/admin/prescriptions",
    tag = "Prescriptions",
    security(("bearerAuth" = [])),
    params(PrescriptionFilter, Pagination),
    responses(
        (status = 200, description = "Refill and transfer requests, newest first", body = PrescriptionsResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_prescriptions(
    State(state): State<AppState>,
    Query(filter): Query<PrescriptionFilter>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PrescriptionsResponse>, ApiError> {
    let prescriptions = state
        .prescriptions()
        .list(filter.kind, filter.status, pagination.limit(), pagination.offset())
        .await?;
    Ok(Json(PrescriptionsResponse {
        prescriptions,
        page: pagination.page(),
        per_page: pagination.per_page(),
    }))
}

#[utoipa::path(
    patch,
    path = "/api/admin/prescriptions/{id}/status",
    tag = "Prescriptions",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Prescription public identifier")),
    request_body = UpdatePrescriptionStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = Prescription),
        (status = 404, description = "Prescription not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Transition not allowed", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_prescription_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdatePrescriptionStatusRequest>,
) -> Result<Json<Prescription>, ApiError> {
    let prescription = state.prescriptions().update_status(&id, request.status).await?;
    Ok(Json(prescription))
}
