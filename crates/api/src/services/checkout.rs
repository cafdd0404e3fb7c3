use std::collections::BTreeMap;

use chrono::Utc;
use pharmacy_database::{
    CustomerRepository, NewNotification, NotificationKind, NotificationRepository, OrderDetail,
    OrderLine, OrderRepository, OrderStatus,
};
use pharmacy_integrations::StripeClient;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{error, info, warn};
use utoipa::ToSchema;

use super::validation::{contact, ContactForm, Validator};
use super::ServiceError;

const MAX_LINE_QUANTITY: i64 = 1_000;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub customer: ContactForm,
    pub items: Vec<OrderLine>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub order: OrderDetail,
    /// Present when a payment intent was created.
    pub client_secret: Option<String>,
    pub payment_intent_id: Option<String>,
}

/// Place an order and, with Stripe configured, open a payment intent for it.
///
/// A payment intent failure cancels the order so its stock is released.
pub async fn checkout(
    pool: &SqlitePool,
    stripe: Option<&StripeClient>,
    currency: &str,
    request: CheckoutRequest,
) -> Result<CheckoutResponse, ServiceError> {
    let mut validator = Validator::new();
    let contact = contact(&mut validator, &request.customer, false, Utc::now().date_naive());
    if request.items.is_empty() {
        validator.problem("items", "must contain at least one item");
    }
    for (index, line) in request.items.iter().enumerate() {
        if line.product_id.trim().is_empty() {
            validator.problem(&format!("items[{index}].product_id"), "is required");
        }
        if !(1..=MAX_LINE_QUANTITY).contains(&line.quantity) {
            validator.problem(&format!("items[{index}].quantity"), "must be between 1 and 1000");
        }
    }
    let notes = validator.optional("notes", request.notes.as_deref());
    validator.finish()?;

    let customer = CustomerRepository::new(pool.clone())
        .upsert_by_email(&contact)
        .await?;
    let orders = OrderRepository::new(pool.clone());
    let order = orders
        .create_with_items(customer.id, &request.items, currency, notes.as_deref())
        .await?;
    let order_id = order.order.public_id.clone();

    let (order, intent) = match stripe {
        Some(stripe) => {
            let mut metadata = BTreeMap::new();
            metadata.insert("order_id".to_string(), order_id.clone());
            metadata.insert("customer_email".to_string(), customer.email.clone());

            let intent = match stripe
                .create_payment_intent(order.order.total_cents, currency, &metadata)
                .await
            {
                Ok(intent) => intent,
                Err(err) => {
                    warn!(error = %err, order_id = %order_id, "payment intent failed, cancelling order");
                    if let Err(cancel) = orders.update_status(&order_id, OrderStatus::Cancelled).await {
                        error!(error = %cancel, order_id = %order_id, "failed to cancel unpaid order");
                    }
                    return Err(err.into());
                }
            };

            orders.set_payment_intent(order.order.id, &intent.id).await?;
            let order = orders
                .find_by_public_id(&order_id)
                .await?
                .ok_or_else(|| ServiceError::not_found("order"))?;
            (order, Some(intent))
        }
        None => (order, None),
    };

    let notification = NewNotification {
        kind: NotificationKind::NewOrder,
        title: "New order".into(),
        message: format!(
            "{} placed an order of {} {}",
            customer.full_name(),
            format_amount(order.order.total_cents),
            order.order.currency.to_ascii_uppercase()
        ),
        reference: Some(order_id.clone()),
    };
    if let Err(err) = NotificationRepository::new(pool.clone()).create(&notification).await {
        warn!(error = %err, order_id = %order_id, "failed to create order notification");
    }

    info!(
        order_id = %order_id,
        total_cents = order.order.total_cents,
        payment_intent = intent.is_some(),
        "checkout completed"
    );
    Ok(CheckoutResponse {
        order,
        client_secret: intent.as_ref().and_then(|i| i.client_secret.clone()),
        payment_intent_id: intent.map(|i| i.id),
    })
}

fn format_amount(cents: i64) -> String {
    format!("{}.{:02}", cents / 100, (cents % 100).abs())
}

#[cfg(test)]
mod tests {
    use super::format_amount;

    #[test]
    fn amounts_render_with_two_decimals() {
        assert_eq!(format_amount(0), "0.00");
        assert_eq!(format_amount(1999), "19.99");
        assert_eq!(format_amount(100_005), "1000.05");
    }
}
