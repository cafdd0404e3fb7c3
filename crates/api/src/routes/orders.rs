use axum::{
    extract::{Path, Query, State},
    Json,
};
use pharmacy_database::{Order, OrderDetail, OrderStatus};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::util::Pagination;
use crate::{ApiError, AppState};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrdersResponse {
    pub orders: Vec<Order>,
    pub page: u32,
    pub per_page: u32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[utoipa::path(
    get,
    path = "/api/admin/orders",
    tag = "Orders",
    security(("bearerAuth" = [])),
    params(OrderFilter, Pagination),
    responses(
        (status = 200, description = "Orders, newest first", body = OrdersResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(filter): Query<OrderFilter>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<OrdersResponse>, ApiError> {
    let orders = state
        .orders()
        .list(filter.status, pagination.limit(), pagination.offset())
        .await?;
    Ok(Json(OrdersResponse {
        orders,
        page: pagination.page(),
        per_page: pagination.per_page(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders/{id}",
    tag = "Orders",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Order public identifier")),
    responses(
        (status = 200, description = "Order with line items", body = OrderDetail),
        (status = 404, description = "Order not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OrderDetail>, ApiError> {
    let order = state
        .orders()
        .find_by_public_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("order not found"))?;
    Ok(Json(order))
}

#[utoipa::path(
    patch,
    path = "/api/admin/orders/{id}/status",
    tag = "Orders",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Order public identifier")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status changed; cancelling restocks the items", body = OrderDetail),
        (status = 404, description = "Order not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Transition not allowed", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> Result<Json<OrderDetail>, ApiError> {
    let order = state.orders().update_status(&id, request.status).await?;
    Ok(Json(order))
}
