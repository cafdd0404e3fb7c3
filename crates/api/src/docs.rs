use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health::health_check,
        crate::routes::health::service_health,
        crate::routes::catalog::list_products,
        crate::routes::catalog::get_product,
        crate::routes::catalog::list_categories,
        crate::routes::blog::list_posts,
        crate::routes::blog::get_post,
        crate::routes::forms::submit_appointment,
        crate::routes::forms::submit_refill,
        crate::routes::forms::submit_transfer,
        crate::routes::checkout::checkout,
        crate::routes::admin_auth::login,
        crate::routes::admin_auth::logout,
        crate::routes::admin_auth::current_session,
        crate::routes::admin_auth::csrf_token,
        crate::routes::admin_auth::login_attempts,
        crate::routes::dashboard::dashboard,
        crate::routes::customers::list_customers,
        crate::routes::customers::get_customer,
        crate::routes::customers::update_customer,
        crate::routes::customers::add_interaction,
        crate::routes::inventory::list_products,
        crate::routes::inventory::low_stock,
        crate::routes::inventory::create_product,
        crate::routes::inventory::list_categories,
        crate::routes::inventory::create_category,
        crate::routes::inventory::adjust_stock,
        crate::routes::inventory::list_movements,
        crate::routes::orders::list_orders,
        crate::routes::orders::get_order,
        crate::routes::orders::update_order_status,
        crate::routes::prescriptions::list_prescriptions,
        crate::routes::prescriptions::update_prescription_status,
        crate::routes::appointments::list_appointments,
        crate::routes::appointments::update_appointment_status,
        crate::routes::notifications::list_notifications,
        crate::routes::notifications::mark_read,
        crate::routes::notifications::mark_all_read,
        crate::routes::monitoring::metrics,
        crate::routes::monitoring::alerts,
        crate::routes::system::list_shards,
        crate::routes::system::resolve_shard,
        crate::routes::system::list_backups,
        crate::routes::system::create_backup
    ),
    components(
        schemas(
            crate::error::ErrorResponse,
            crate::routes::health::HealthResponse,
            crate::routes::catalog::ProductsResponse,
            crate::routes::catalog::CategoriesResponse,
            crate::routes::blog::PostsResponse,
            crate::routes::admin_auth::LoginRequest,
            crate::routes::admin_auth::SessionResponse,
            crate::routes::admin_auth::LoginAttemptsResponse,
            crate::routes::customers::CustomersResponse,
            crate::routes::inventory::InventoryResponse,
            crate::routes::inventory::MovementsResponse,
            crate::routes::orders::OrdersResponse,
            crate::routes::orders::UpdateOrderStatusRequest,
            crate::routes::prescriptions::PrescriptionsResponse,
            crate::routes::prescriptions::UpdatePrescriptionStatusRequest,
            crate::routes::appointments::AppointmentsResponse,
            crate::routes::appointments::UpdateAppointmentStatusRequest,
            crate::routes::notifications::NotificationsResponse,
            crate::routes::notifications::BulkUpdateResponse,
            crate::routes::monitoring::AlertsResponse,
            crate::routes::system::ShardsResponse,
            crate::routes::system::BackupsResponse,
            crate::services::validation::ContactForm,
            crate::services::forms::AppointmentForm,
            crate::services::forms::RefillForm,
            crate::services::forms::TransferForm,
            crate::services::forms::FormReceipt,
            crate::services::checkout::CheckoutRequest,
            crate::services::checkout::CheckoutResponse,
            crate::services::dashboard::DashboardSummary,
            crate::services::customers::CustomerDetail,
            pharmacy_auth::AdminSession,
            pharmacy_auth::CsrfToken,
            pharmacy_auth::LoginAttempt,
            pharmacy_database::Customer,
            pharmacy_database::CustomerStatus,
            pharmacy_database::CustomerListEntry,
            pharmacy_database::CustomerInteraction,
            pharmacy_database::InteractionType,
            pharmacy_database::NewInteraction,
            pharmacy_database::UpdateCustomerRequest,
            pharmacy_database::Product,
            pharmacy_database::NewProduct,
            pharmacy_database::Category,
            pharmacy_database::NewCategory,
            pharmacy_database::InventoryMovement,
            pharmacy_database::MovementType,
            pharmacy_database::StockAdjustment,
            pharmacy_database::StockAdjustmentOutcome,
            pharmacy_database::Order,
            pharmacy_database::OrderItem,
            pharmacy_database::OrderDetail,
            pharmacy_database::OrderLine,
            pharmacy_database::OrderStatus,
            pharmacy_database::Prescription,
            pharmacy_database::PrescriptionKind,
            pharmacy_database::PrescriptionStatus,
            pharmacy_database::Appointment,
            pharmacy_database::AppointmentStatus,
            pharmacy_database::Notification,
            pharmacy_database::NotificationKind,
            pharmacy_database::ShardHealth,
            pharmacy_database::ShardSelection,
            pharmacy_database::BackupRecord,
            pharmacy_integrations::WooProduct,
            pharmacy_integrations::WooCategory,
            pharmacy_integrations::woocommerce::WooCategoryRef,
            pharmacy_integrations::woocommerce::WooImage,
            pharmacy_integrations::BlogPost,
            pharmacy_monitoring::HealthReport,
            pharmacy_monitoring::SystemMetrics,
            pharmacy_monitoring::Alert,
            pharmacy_monitoring::Severity
        )
    ),
    tags(
        (name = "Health", description = "Liveness and dependency health"),
        (name = "Catalog", description = "Storefront products from WooCommerce"),
        (name = "Blog", description = "Posts from WordPress"),
        (name = "Forms", description = "Appointment, refill and transfer requests"),
        (name = "Checkout", description = "Orders and payment intents"),
        (name = "Admin Auth", description = "Admin sign-in, session and CSRF tokens"),
        (name = "Admin", description = "Admin dashboard"),
        (name = "Customers", description = "CRM"),
        (name = "Inventory", description = "Products, categories and stock movements"),
        (name = "Orders", description = "Order management"),
        (name = "Prescriptions", description = "Refill and transfer request handling"),
        (name = "Appointments", description = "Appointment scheduling"),
        (name = "Notifications", description = "Admin notifications"),
        (name = "Monitoring", description = "System metrics and alerts"),
        (name = "System", description = "Shards and backups")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        let schemes = &mut components.security_schemes;

        let mut scheme = SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer));
        if let SecurityScheme::Http(http) = &mut scheme {
            http.bearer_format = Some("JWT".to_string());
        }

        schemes.insert("bearerAuth".to_string(), scheme);
    }
}
