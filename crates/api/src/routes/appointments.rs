use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use pharmacy_database::{format_timestamp, Appointment, AppointmentStatus};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::util::Pagination;
use crate::{ApiError, AppState};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AppointmentFilter {
    pub status: Option<AppointmentStatus>,
    /// RFC 3339 timestamp; only appointments at or after it are returned.
    pub from: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AppointmentsResponse {
    pub appointments: Vec<Appointment>,
    pub page: u32,
    pub per_page: u32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateAppointmentStatusRequest {
    pub status: AppointmentStatus,
}

#[utoipa::path(
    get,
    path = "/api/admin/appointments",
    tag = "Appointments",
    security(("bearerAuth" = [])),
    params(AppointmentFilter, Pagination),
    responses(
        (status = 200, description = "Appointments by scheduled time", body = AppointmentsResponse),
        (status = 400, description = "Malformed `from` timestamp", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_appointments(
    State(state): State<AppState>,
    Query(filter): Query<AppointmentFilter>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<AppointmentsResponse>, ApiError> {
    let from = filter
        .from
        .as_deref()
        .map(|raw| {
            DateTime::parse_from_rfc3339(raw)
                .map(|at| format_timestamp(at.with_timezone(&Utc)))
                .map_err(|_| ApiError::validation("from: must be an RFC 3339 timestamp"))
        })
        .transpose()?;

    let appointments = state
        .appointments()
        .list(filter.status, from.as_deref(), pagination.limit(), pagination.offset())
        .await?;
    Ok(Json(AppointmentsResponse {
        appointments,
        page: pagination.page(),
        per_page: pagination.per_page(),
    }))
}

#[utoipa::path(
    patch,
    path = "/api/admin/appointments/{id}/status",
    tag = "Appointments",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Appointment public identifier")),
    request_body = UpdateAppointmentStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = Appointment),
        (status = 404, description = "Appointment not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Transition not allowed", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_appointment_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateAppointmentStatusRequest>,
) -> Result<Json<Appointment>, ApiError> {
    let appointment = state.appointments().update_status(&id, request.status).await?;
    Ok(Json(appointment))
}
