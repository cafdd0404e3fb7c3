use pharmacy_database::{
    NewNotification, NotificationKind, NotificationRepository, ProductRepository,
    StockAdjustment, StockAdjustmentOutcome,
};
use sqlx::SqlitePool;
use tracing::{info, warn};

use super::ServiceError;

/// Apply a stock adjustment. Falling to the reorder level raises a
/// low-stock notification.
pub async fn adjust_stock(
    pool: &SqlitePool,
    product_public_id: &str,
    adjustment: &StockAdjustment,
) -> Result<StockAdjustmentOutcome, ServiceError> {
    let outcome = ProductRepository::new(pool.clone())
        .adjust_stock(product_public_id, adjustment)
        .await?;

    info!(
        product_id = %product_public_id,
        change = adjustment.quantity_change,
        movement = %adjustment.movement_type,
        stock = outcome.product.stock_quantity,
        "stock adjusted"
    );

    if outcome.crossed_reorder_level {
        let product = &outcome.product;
        let notification = NewNotification {
            kind: NotificationKind::LowStock,
            title: format!("Low stock: {}", product.name),
            message: format!(
                "{} ({}) is down to {} units, reorder level is {}",
                product.name, product.sku, product.stock_quantity, product.reorder_level
            ),
            reference: Some(product.public_id.clone()),
        };
        if let Err(error) = NotificationRepository::new(pool.clone()).create(&notification).await {
            warn!(%error, sku = %product.sku, "failed to create low stock notification");
        }
    }

    Ok(outcome)
}
