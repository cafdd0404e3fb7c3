use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use pharmacy_database::{
    Category, InventoryMovement, NewCategory, NewProduct, Product, StockAdjustment,
    StockAdjustmentOutcome,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::services::inventory as inventory_service;
use crate::{ApiError, AppState};

const DEFAULT_MOVEMENT_LIMIT: i64 = 50;
const MAX_MOVEMENT_LIMIT: i64 = 500;

#[derive(Debug, Serialize, ToSchema)]
pub struct InventoryResponse {
    pub products: Vec<Product>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MovementsResponse {
    pub movements: Vec<InventoryMovement>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MovementQuery {
    /// Defaults to 50, at most 500.
    pub limit: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/inventory/admin/all",
    tag = "Inventory",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Every product with stock levels", body = InventoryResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_products(State(state): State<AppState>) -> Result<Json<InventoryResponse>, ApiError> {
    let products = state.products().list_all().await?;
    Ok(Json(InventoryResponse { products }))
}

#[utoipa::path(
    get,
    path = "/api/inventory/admin/low-stock",
    tag = "Inventory",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Active products at or below their reorder level", body = InventoryResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse)
    )
)]
pub async fn low_stock(State(state): State<AppState>) -> Result<Json<InventoryResponse>, ApiError> {
    let products = state.products().list_low_stock().await?;
    Ok(Json(InventoryResponse { products }))
}

#[utoipa::path(
    post,
    path = "/api/inventory/admin/products",
    tag = "Inventory",
    security(("bearerAuth" = [])),
    request_body = NewProduct,
    responses(
        (status = 201, description = "Product created", body = Product),
        (status = 400, description = "Invalid product", body = crate::error::ErrorResponse),
        (status = 409, description = "SKU already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_product(
    State(state): State<AppState>,
    Json(request): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = state.products().create(&request).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

#[utoipa::path(
    post,
    path = "/api/inventory/admin/categories",
    tag = "Inventory",
    security(("bearerAuth" = [])),
    request_body = NewCategory,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 409, description = "Category already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_category(
    State(state): State<AppState>,
    Json(request): Json<NewCategory>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let category = state.products().create_category(&request).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

#[utoipa::path(
    post,
    path = "/api/inventory/admin/products/{id}/adjust",
    tag = "Inventory",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Product public identifier")),
    request_body = StockAdjustment,
    responses(
        (status = 200, description = "Stock adjusted", body = StockAdjustmentOutcome),
        (status = 404, description = "Product not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Stock would go negative", body = crate::error::ErrorResponse)
    )
)]
pub async fn adjust_stock(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<StockAdjustment>,
) -> Result<Json<StockAdjustmentOutcome>, ApiError> {
    let outcome = inventory_service::adjust_stock(state.db_pool(), &id, &request).await?;
    Ok(Json(outcome))
}

#[utoipa::path(
    get,
    path = "/api/inventory/admin/products/{id}/movements",
    tag = "Inventory",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Product public identifier"), MovementQuery),
    responses(
        (status = 200, description = "Stock movements, newest first", body = MovementsResponse),
        (status = 404, description = "Product not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_movements(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<MovementQuery>,
) -> Result<Json<MovementsResponse>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_MOVEMENT_LIMIT)
        .clamp(1, MAX_MOVEMENT_LIMIT);
    let movements = state.products().movements_for_product(&id, limit).await?;
    Ok(Json(MovementsResponse { movements }))
}

#[utoipa::path(
    get,
    path = "/api/inventory/admin/categories",
    tag = "Inventory",
    security(("bearerAuth" = [])),
    responses((status = 200, description = "All categories", body = [Category]))
)]
pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(state.products().list_categories().await?))
}
