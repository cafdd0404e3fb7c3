use axum::{extract::State, http::StatusCode, Json};

use crate::services::forms::{self as form_service, AppointmentForm, FormReceipt, RefillForm, TransferForm};
use crate::{ApiError, AppState};

#[utoipa::path(
    post,
    path = "/api/forms/appointments",
    tag = "Forms",
    request_body = AppointmentForm,
    responses(
        (status = 201, description = "Appointment requested", body = FormReceipt),
        (status = 400, description = "Invalid submission", body = crate::error::ErrorResponse)
    )
)]
pub async fn submit_appointment(
    State(state): State<AppState>,
    Json(form): Json<AppointmentForm>,
) -> Result<(StatusCode, Json<FormReceipt>), ApiError> {
    let receipt = form_service::submit_appointment(state.db_pool(), form).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

#[utoipa::path(
    post,
    path = "/api/forms/refills",
    tag = "Forms",
    request_body = RefillForm,
    responses(
        (status = 201, description = "Refill requested", body = FormReceipt),
        (status = 400, description = "Invalid submission", body = crate::error::ErrorResponse)
    )
)]
pub async fn submit_refill(
    State(state): State<AppState>,
    Json(form): Json<RefillForm>,
) -> Result<(StatusCode, Json<FormReceipt>), ApiError> {
    let receipt = form_service::submit_refill(state.db_pool(), form).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

#[utoipa::path(
    post,
    path = "/api/forms/transfers",
    tag = "Forms",
    request_body = TransferForm,
    responses(
        (status = 201, description = "Transfer requested", body = FormReceipt),
        (status = 400, description = "Invalid submission", body = crate::error::ErrorResponse)
    )
)]
pub async fn submit_transfer(
    State(state): State<AppState>,
    Json(form): Json<TransferForm>,
) -> Result<(StatusCode, Json<FormReceipt>), ApiError> {
    let receipt = form_service::submit_transfer(state.db_pool(), form).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}
