//! Orders, line items and the stock they consume.

use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::info;

use super::product_repository::insert_movement;
use crate::entities::order::{Order, OrderDetail, OrderItem, OrderLine, OrderStatus};
use crate::entities::product::MovementType;
use crate::errors::{DatabaseError, DatabaseResult};
use crate::time::now_timestamp;

const ORDER_SELECT: &str = r#"
    SELECT o.id, o.public_id, o.customer_id, c.public_id AS customer_public_id, c.email AS customer_email,
           o.status, o.total_cents, o.currency, o.payment_intent_id, o.notes, o.created_at, o.updated_at
    FROM orders o
    JOIN customers c ON c.id = o.customer_id
"#;

pub struct OrderRepository {
    pool: SqlitePool,
}

struct ResolvedLine {
    product_id: i64,
    name: String,
    quantity: i64,
    unit_price_cents: i64,
    stock_after: i64,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create an order and reserve its stock in one transaction.
    ///
    /// Lines naming the same product are merged. Every product must be
    /// active and have enough stock, otherwise nothing is written.
    pub async fn create_with_items(
        &self,
        customer_id: i64,
        lines: &[OrderLine],
        currency: &str,
        notes: Option<&str>,
    ) -> DatabaseResult<OrderDetail> {
        if lines.is_empty() {
            return Err(DatabaseError::Validation("order must contain at least one item".into()));
        }

        let mut merged: Vec<(String, i64)> = Vec::with_capacity(lines.len());
        for line in lines {
            if line.quantity <= 0 {
                return Err(DatabaseError::Validation("item quantity must be positive".into()));
            }
            match merged.iter_mut().find(|(id, _)| id == &line.product_id) {
                Some((_, quantity)) => {
                    *quantity = quantity
                        .checked_add(line.quantity)
                        .ok_or_else(|| DatabaseError::Validation("item quantity is too large".into()))?;
                }
                None => merged.push((line.product_id.clone(), line.quantity)),
            }
        }

        let now = now_timestamp();
        let mut tx = self.pool.begin().await?;

        let mut resolved = Vec::with_capacity(merged.len());
        for (product_public_id, quantity) in &merged {
            // The guarded decrement is the first statement so the transaction
            // holds the write lock before anything is read.
            let reserved: Option<(i64, String, i64, i64)> = sqlx::query_as(
                r#"
                UPDATE products SET stock_quantity = stock_quantity - ?1, updated_at = ?2
                WHERE public_id = ?3 AND is_active = true AND stock_quantity >= ?1
                RETURNING id, name, price_cents, stock_quantity
                "#,
            )
            .bind(*quantity)
            .bind(&now)
            .bind(product_public_id)
            .fetch_optional(&mut *tx)
            .await?;

            let Some((product_id, name, price_cents, stock_after)) = reserved else {
                return Err(unreservable(&mut tx, product_public_id, *quantity).await);
            };

            resolved.push(ResolvedLine {
                product_id,
                name,
                quantity: *quantity,
                unit_price_cents: price_cents,
                stock_after,
            });
        }

        let total_cents = resolved
            .iter()
            .try_fold(0_i64, |total, line| {
                line.unit_price_cents
                    .checked_mul(line.quantity)
                    .and_then(|subtotal| total.checked_add(subtotal))
            })
            .ok_or_else(|| DatabaseError::Validation("order total is too large".into()))?;

        let public_id = cuid2::cuid();
        let order_id = sqlx::query(
            r#"
            INSERT INTO orders (public_id, customer_id, status, total_cents, currency, notes, created_at, updated_at)
            VALUES (?, ?, 'pending', ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&public_id)
        .bind(customer_id)
        .bind(total_cents)
        .bind(currency.to_ascii_lowercase())
        .bind(notes)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        for line in &resolved {
            insert_movement(
                &mut tx,
                line.product_id,
                MovementType::Sale,
                -line.quantity,
                line.stock_after,
                Some("order placed"),
                Some(&public_id),
            )
            .await?;

            sqlx::query(
                "INSERT INTO order_items (order_id, product_id, product_name, quantity, unit_price_cents) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(order_id)
            .bind(line.product_id)
            .bind(&line.name)
            .bind(line.quantity)
            .bind(line.unit_price_cents)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!(order_id = %public_id, total_cents, items = resolved.len(), "order created");

        self.find_by_public_id(&public_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("order".into()))
    }

    pub async fn set_payment_intent(&self, order_id: i64, payment_intent_id: &str) -> DatabaseResult<()> {
        sqlx::query("UPDATE orders SET payment_intent_id = ?, updated_at = ? WHERE id = ?")
            .bind(payment_intent_id)
            .bind(now_timestamp())
            .bind(order_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn find_by_public_id(&self, public_id: &str) -> DatabaseResult<Option<OrderDetail>> {
        let order = sqlx::query_as::<_, Order>(&format!("{ORDER_SELECT} WHERE o.public_id = ?"))
            .bind(public_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(order) = order else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT i.id, i.order_id, p.public_id AS product_public_id, i.product_name, i.quantity, i.unit_price_cents
            FROM order_items i
            JOIN products p ON p.id = i.product_id
            WHERE i.order_id = ?
            ORDER BY i.id ASC
            "#,
        )
        .bind(order.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(OrderDetail { order, items }))
    }

    pub async fn list(
        &self,
        status: Option<OrderStatus>,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "{ORDER_SELECT} WHERE (?1 IS NULL OR o.status = ?1) ORDER BY o.created_at DESC, o.id DESC LIMIT ?2 OFFSET ?3"
        ))
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }

    pub async fn list_for_customer(&self, customer_id: i64) -> DatabaseResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "{ORDER_SELECT} WHERE o.customer_id = ? ORDER BY o.created_at DESC, o.id DESC"
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }

    pub async fn count(&self) -> DatabaseResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Move an order along its lifecycle. Cancelling puts the reserved stock back.
    pub async fn update_status(
        &self,
        public_id: &str,
        next: OrderStatus,
    ) -> DatabaseResult<OrderDetail> {
        let (order_id, current): (i64, OrderStatus) =
            sqlx::query_as("SELECT id, status FROM orders WHERE public_id = ?")
                .bind(public_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| DatabaseError::NotFound("order".into()))?;

        if !current.can_transition_to(next) {
            return Err(DatabaseError::InvalidTransition {
                from: current.to_string(),
                to: next.to_string(),
            });
        }

        let now = now_timestamp();
        let mut tx = self.pool.begin().await?;

        // Compare-and-set against the status read above. As the first
        // statement it also takes the write lock for the restock below.
        let result = sqlx::query("UPDATE orders SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
            .bind(next)
            .bind(&now)
            .bind(order_id)
            .bind(current)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::InvalidTransition {
                from: current.to_string(),
                to: next.to_string(),
            });
        }

        if next == OrderStatus::Cancelled {
            let items: Vec<(i64, i64)> =
                sqlx::query_as("SELECT product_id, quantity FROM order_items WHERE order_id = ?")
                    .bind(order_id)
                    .fetch_all(&mut *tx)
                    .await?;

            for (product_id, quantity) in items {
                let stock_after = sqlx::query_scalar::<_, i64>(
                    "UPDATE products SET stock_quantity = stock_quantity + ?, updated_at = ? WHERE id = ? RETURNING stock_quantity",
                )
                .bind(quantity)
                .bind(&now)
                .bind(product_id)
                .fetch_one(&mut *tx)
                .await?;

                insert_movement(
                    &mut tx,
                    product_id,
                    MovementType::Return,
                    quantity,
                    stock_after,
                    Some("order cancelled"),
                    Some(public_id),
                )
                .await?;
            }
        }

        tx.commit().await?;
        info!(order_id = %public_id, from = %current, to = %next, "order status changed");

        self.find_by_public_id(public_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("order".into()))
    }

    /// Revenue from orders that were not cancelled and left the pending state.
    pub async fn revenue_cents(&self) -> DatabaseResult<i64> {
        let revenue = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(total_cents), 0) FROM orders WHERE status IN ('processing', 'completed')",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(revenue)
    }
}

/// Explain why a guarded stock decrement matched no row.
async fn unreservable(
    tx: &mut Transaction<'_, Sqlite>,
    product_public_id: &str,
    quantity: i64,
) -> DatabaseError {
    let row: Result<Option<(String, i64, bool)>, sqlx::Error> =
        sqlx::query_as("SELECT sku, stock_quantity, is_active FROM products WHERE public_id = ?")
            .bind(product_public_id)
            .fetch_optional(&mut **tx)
            .await;

    match row {
        Err(error) => DatabaseError::Query(error),
        Ok(None) => DatabaseError::NotFound(format!("product {product_public_id}")),
        Ok(Some((sku, _, false))) => DatabaseError::Validation(format!("product {sku} is not available")),
        Ok(Some((sku, available, true))) => DatabaseError::InsufficientStock {
            sku,
            available,
            requested: quantity,
        },
    }
}
