use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use pharmacy_database::{
    Customer, CustomerInteraction, CustomerListEntry, NewInteraction, UpdateCustomerRequest,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::middleware::AdminContext;
use crate::services::customers::{self as customer_service, CustomerDetail};
use crate::util::Pagination;
use crate::{ApiError, AppState};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CustomerSearch {
    /// Matches email, first name, last name or phone.
    pub search: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CustomersResponse {
    pub customers: Vec<CustomerListEntry>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

#[utoipa::path(
    get,
    path = "/api/admin/customers",
    tag = "Customers",
    security(("bearerAuth" = [])),
    params(CustomerSearch, Pagination),
    responses(
        (status = 200, description = "Customers, newest first", body = CustomersResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_customers(
    State(state): State<AppState>,
    Query(search): Query<CustomerSearch>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<CustomersResponse>, ApiError> {
    let search = search
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let repo = state.customers();
    let (customers, total) = tokio::try_join!(
        repo.list(search, pagination.limit(), pagination.offset()),
        repo.count(search),
    )?;

    Ok(Json(CustomersResponse {
        customers,
        total,
        page: pagination.page(),
        per_page: pagination.per_page(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/admin/customers/{id}",
    tag = "Customers",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Customer public identifier")),
    responses(
        (status = 200, description = "Customer with orders, requests and interactions", body = CustomerDetail),
        (status = 404, description = "Customer not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CustomerDetail>, ApiError> {
    let detail = customer_service::customer_detail(state.db_pool(), &id).await?;
    Ok(Json(detail))
}

#[utoipa::path(
    patch,
    path = "/api/admin/customers/{id}",
    tag = "Customers",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Customer public identifier")),
    request_body = UpdateCustomerRequest,
    responses(
        (status = 200, description = "Customer updated", body = Customer),
        (status = 403, description = "Missing or invalid CSRF token", body = crate::error::ErrorResponse),
        (status = 404, description = "Customer not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_customer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateCustomerRequest>,
) -> Result<Json<Customer>, ApiError> {
    let customer = state.customers().update(&id, &request).await?;
    Ok(Json(customer))
}

#[utoipa::path(
    post,
    path = "/api/admin/customers/{id}/interactions",
    tag = "Customers",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Customer public identifier")),
    request_body = NewInteraction,
    responses(
        (status = 201, description = "Interaction recorded", body = CustomerInteraction),
        (status = 400, description = "Empty summary", body = crate::error::ErrorResponse),
        (status = 404, description = "Customer not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn add_interaction(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminContext>,
    Path(id): Path<String>,
    Json(request): Json<NewInteraction>,
) -> Result<(StatusCode, Json<CustomerInteraction>), ApiError> {
    let interaction =
        customer_service::add_interaction(state.db_pool(), &id, &request, &admin.email).await?;
    Ok((StatusCode::CREATED, Json(interaction)))
}
