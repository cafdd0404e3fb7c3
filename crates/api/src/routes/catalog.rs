//! Storefront catalog, proxied from WooCommerce.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use pharmacy_integrations::{Page, ProductQuery, WooCategory, WooProduct};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{ApiError, AppState};

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductsResponse {
    pub products: Vec<WooProduct>,
    pub page: u32,
    pub per_page: u32,
    pub total: Option<u64>,
    pub total_pages: Option<u64>,
}

impl From<Page<WooProduct>> for ProductsResponse {
    fn from(page: Page<WooProduct>) -> Self {
        Self {
            products: page.items,
            page: page.page,
            per_page: page.per_page,
            total: page.total,
            total_pages: page.total_pages,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoriesResponse {
    pub categories: Vec<WooCategory>,
}

#[utoipa::path(
    get,
    path = "/api/catalog/products",
    tag = "Catalog",
    params(ProductQuery),
    responses(
        (status = 200, description = "One page of published products", body = ProductsResponse),
        (status = 502, description = "Store request failed", body = crate::error::ErrorResponse),
        (status = 503, description = "Store not configured", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<ProductsResponse>, ApiError> {
    let page = state.integrations().woocommerce()?.list_products(&query).await?;
    Ok(Json(page.into()))
}

#[utoipa::path(
    get,
    path = "/api/catalog/products/{id}",
    tag = "Catalog",
    params(("id" = u64, Path, description = "WooCommerce product id")),
    responses(
        (status = 200, description = "Product", body = WooProduct),
        (status = 404, description = "Unknown product", body = crate::error::ErrorResponse),
        (status = 502, description = "Store request failed", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<WooProduct>, ApiError> {
    let product = state.integrations().woocommerce()?.get_product(id).await?;
    Ok(Json(product))
}

#[utoipa::path(
    get,
    path = "/api/catalog/categories",
    tag = "Catalog",
    responses(
        (status = 200, description = "Non-empty product categories", body = CategoriesResponse),
        (status = 502, description = "Store request failed", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<CategoriesResponse>, ApiError> {
    let categories = state.integrations().woocommerce()?.list_categories().await?;
    Ok(Json(CategoriesResponse { categories }))
}
