use chrono::Utc;
use pharmacy_database::{
    format_timestamp, AppointmentRepository, CustomerRepository, NotificationRepository,
    OrderRepository, PrescriptionRepository, PrescriptionStatus, ProductRepository,
};
use serde::Serialize;
use sqlx::SqlitePool;
use utoipa::ToSchema;

use super::ServiceError;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardSummary {
    pub customers: i64,
    pub orders: i64,
    /// Processing and completed orders, in cents.
    pub revenue_cents: i64,
    pub pending_prescriptions: i64,
    pub upcoming_appointments: i64,
    pub low_stock_products: i64,
    pub unread_notifications: i64,
    pub generated_at: String,
}

pub async fn summary(pool: &SqlitePool) -> Result<DashboardSummary, ServiceError> {
    let now = format_timestamp(Utc::now());

    let customers = CustomerRepository::new(pool.clone());
    let orders = OrderRepository::new(pool.clone());
    let prescriptions = PrescriptionRepository::new(pool.clone());
    let appointments = AppointmentRepository::new(pool.clone());
    let products = ProductRepository::new(pool.clone());
    let notifications = NotificationRepository::new(pool.clone());

    let (
        customer_count,
        order_count,
        revenue_cents,
        pending_prescriptions,
        upcoming_appointments,
        low_stock_products,
        unread_notifications,
    ) = tokio::try_join!(
        customers.count(None),
        orders.count(),
        orders.revenue_cents(),
        prescriptions.count_by_status(PrescriptionStatus::Pending),
        appointments.count_upcoming(&now),
        products.count_low_stock(),
        notifications.unread_count(),
    )?;

    Ok(DashboardSummary {
        customers: customer_count,
        orders: order_count,
        revenue_cents,
        pending_prescriptions,
        upcoming_appointments,
        low_stock_products,
        unread_notifications,
        generated_at: now,
    })
}
