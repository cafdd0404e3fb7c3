//! HTTP surface of the pharmacy backend.
//!
//! Public routes serve the storefront (catalog, blog, forms, checkout).
//! Admin routes sit behind [`middleware::require_admin`].

mod docs;
mod error;
pub mod middleware;
mod state;
mod util;

pub mod routes;
pub mod services;

pub use docs::ApiDoc;
pub use error::{ApiError, ErrorResponse};
pub use middleware::{AdminContext, CSRF_HEADER};
pub use state::AppState;

use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    middleware::from_fn_with_state,
    routing::{get, patch, post},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;

pub fn build_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/docs/openapi.json", get(openapi_document))
        .route("/api/monitoring/health", get(routes::health::service_health))
        .route("/api/catalog/products", get(routes::catalog::list_products))
        .route("/api/catalog/products/:id", get(routes::catalog::get_product))
        .route("/api/catalog/categories", get(routes::catalog::list_categories))
        .route("/api/blog/posts", get(routes::blog::list_posts))
        .route("/api/blog/posts/:slug", get(routes::blog::get_post))
        .route("/api/forms/appointments", post(routes::forms::submit_appointment))
        .route("/api/forms/refills", post(routes::forms::submit_refill))
        .route("/api/forms/transfers", post(routes::forms::submit_transfer))
        .route("/api/checkout", post(routes::checkout::checkout))
        .route("/api/admin/login", post(routes::admin_auth::login));

    let admin = Router::new()
        // Session
        .route("/api/admin/logout", post(routes::admin_auth::logout))
        .route("/api/admin/session", get(routes::admin_auth::current_session))
        .route("/api/admin/csrf-token", get(routes::admin_auth::csrf_token))
        .route("/api/admin/login-attempts", get(routes::admin_auth::login_attempts))
        .route("/api/admin/dashboard", get(routes::dashboard::dashboard))
        // CRM
        .route("/api/admin/customers", get(routes::customers::list_customers))
        .route(
            "/api/admin/customers/:id",
            get(routes::customers::get_customer).patch(routes::customers::update_customer),
        )
        .route(
            "/api/admin/customers/:id/interactions",
            post(routes::customers::add_interaction),
        )
        // Inventory
        .route("/api/inventory/admin/all", get(routes::inventory::list_products))
        .route("/api/inventory/admin/low-stock", get(routes::inventory::low_stock))
        .route("/api/inventory/admin/products", post(routes::inventory::create_product))
        .route(
            "/api/inventory/admin/categories",
            get(routes::inventory::list_categories).post(routes::inventory::create_category),
        )
        .route(
            "/api/inventory/admin/products/:id/adjust",
            post(routes::inventory::adjust_stock),
        )
        .route(
            "/api/inventory/admin/products/:id/movements",
            get(routes::inventory::list_movements),
        )
        // Orders and requests
        .route("/api/admin/orders", get(routes::orders::list_orders))
        .route("/api/admin/orders/:id", get(routes::orders::get_order))
        .route("/api/admin/orders/:id/status", patch(routes::orders::update_order_status))
        .route("/api/admin/prescriptions", get(routes::prescriptions::list_prescriptions))
        .route(
            "/api/admin/prescriptions/:id/status",
            patch(routes::prescriptions::update_prescription_status),
        )
        .route("/api/admin/appointments", get(routes::appointments::list_appointments))
        .route(
            "/api/admin/appointments/:id/status",
            patch(routes::appointments::update_appointment_status),
        )
        .route("/api/admin/notifications", get(routes::notifications::list_notifications))
        .route(
            "/api/admin/notifications/read-all",
            post(routes::notifications::mark_all_read),
        )
        .route(
            "/api/admin/notifications/:id/read",
            post(routes::notifications::mark_read),
        )
        // Operations
        .route("/api/monitoring/metrics", get(routes::monitoring::metrics))
        .route("/api/monitoring/alerts", get(routes::monitoring::alerts))
        .route("/api/admin/shards", get(routes::system::list_shards))
        .route("/api/admin/shards/resolve", get(routes::system::resolve_shard))
        .route(
            "/api/admin/backups",
            get(routes::system::list_backups).post(routes::system::create_backup),
        )
        .route_layer(from_fn_with_state(state.clone(), middleware::require_admin));

    let request_stats = state.monitor().request_stats();

    public
        .merge(admin)
        .with_state(state)
        .layer(cors_layer())
        .layer(from_fn_with_state(request_stats, middleware::track_requests))
}

async fn openapi_document() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, CSRF_HEADER])
        .expose_headers([CSRF_HEADER])
}
