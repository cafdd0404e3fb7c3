use pharmacy_database::{
    Appointment, AppointmentRepository, Customer, CustomerInteraction, CustomerRepository,
    InteractionRepository, NewInteraction, Order, OrderRepository, Prescription,
    PrescriptionRepository,
};
use serde::Serialize;
use sqlx::SqlitePool;
use utoipa::ToSchema;

use super::ServiceError;

/// A customer with everything the CRM shows alongside it.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CustomerDetail {
    pub customer: Customer,
    pub orders: Vec<Order>,
    pub prescriptions: Vec<Prescription>,
    pub appointments: Vec<Appointment>,
    pub interactions: Vec<CustomerInteraction>,
}

async fn find_customer(pool: &SqlitePool, public_id: &str) -> Result<Customer, ServiceError> {
    CustomerRepository::new(pool.clone())
        .find_by_public_id(public_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("customer"))
}

pub async fn customer_detail(
    pool: &SqlitePool,
    public_id: &str,
) -> Result<CustomerDetail, ServiceError> {
    let customer = find_customer(pool, public_id).await?;

    let orders = OrderRepository::new(pool.clone());
    let prescriptions = PrescriptionRepository::new(pool.clone());
    let appointments = AppointmentRepository::new(pool.clone());
    let interactions = InteractionRepository::new(pool.clone());

    let (orders, prescriptions, appointments, interactions) = tokio::try_join!(
        orders.list_for_customer(customer.id),
        prescriptions.list_for_customer(customer.id),
        appointments.list_for_customer(customer.id),
        interactions.list_for_customer(customer.id),
    )?;

    Ok(CustomerDetail {
        customer,
        orders,
        prescriptions,
        appointments,
        interactions,
    })
}

pub async fn add_interaction(
    pool: &SqlitePool,
    customer_public_id: &str,
    request: &NewInteraction,
    created_by: &str,
) -> Result<CustomerInteraction, ServiceError> {
    let customer = find_customer(pool, customer_public_id).await?;
    let interaction = InteractionRepository::new(pool.clone())
        .create(customer.id, request, created_by)
        .await?;
    Ok(interaction)
}
