use axum::{extract::State, http::StatusCode, Json};

use crate::services::checkout::{self as checkout_service, CheckoutRequest, CheckoutResponse};
use crate::{ApiError, AppState};

#[utoipa::path(
    post,
    path = "/api/checkout",
    tag = "Checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Order placed", body = CheckoutResponse),
        (status = 400, description = "Invalid order", body = crate::error::ErrorResponse),
        (status = 404, description = "Unknown product", body = crate::error::ErrorResponse),
        (status = 409, description = "Insufficient stock", body = crate::error::ErrorResponse),
        (status = 502, description = "Payment processor failed", body = crate::error::ErrorResponse)
    )
)]
pub async fn checkout(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>), ApiError> {
    let response = checkout_service::checkout(
        state.db_pool(),
        state.integrations().stripe(),
        state.currency(),
        request,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(response)))
}
