//! Products, categories and inventory movements.

use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{info, warn};

use crate::entities::product::{
    Category, InventoryMovement, MovementType, NewCategory, NewProduct, Product, StockAdjustment,
    StockAdjustmentOutcome,
};
use crate::errors::{DatabaseError, DatabaseResult};
use crate::time::now_timestamp;

pub(crate) const PRODUCT_SELECT: &str = r#"
    SELECT p.id, p.public_id, p.sku, p.name, p.description, c.name AS category_name,
           p.price_cents, p.stock_quantity, p.reorder_level,
           (p.stock_quantity <= p.reorder_level) AS low_stock,
           p.requires_prescription, p.woo_product_id, p.is_active, p.created_at, p.updated_at
    FROM products p
    LEFT JOIN categories c ON c.id = p.category_id
"#;

/// Upper bound for a unit price, keeping order totals well inside `i64`.
pub const MAX_PRICE_CENTS: i64 = 100_000_000;

const MOVEMENT_COLUMNS: &str = "id, public_id, product_id, movement_type, quantity_change, \
     quantity_after, reason, reference, created_at";

pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a product. A positive `initial_stock` is logged as a restock movement.
    pub async fn create(&self, request: &NewProduct) -> DatabaseResult<Product> {
        let sku = request.sku.trim();
        let name = request.name.trim();
        if sku.is_empty() || name.is_empty() {
            return Err(DatabaseError::Validation("sku and name are required".into()));
        }
        if request.price_cents < 0 || request.initial_stock < 0 || request.reorder_level < 0 {
            return Err(DatabaseError::Validation(
                "price, stock and reorder level cannot be negative".into(),
            ));
        }
        if request.price_cents > MAX_PRICE_CENTS {
            return Err(DatabaseError::Validation(format!(
                "price cannot exceed {MAX_PRICE_CENTS} cents"
            )));
        }

        let category_id = match request.category_id.as_deref() {
            Some(category) => Some(
                sqlx::query_scalar::<_, i64>("SELECT id FROM categories WHERE public_id = ?")
                    .bind(category)
                    .fetch_optional(&self.pool)
                    .await?
                    .ok_or_else(|| DatabaseError::NotFound("category".into()))?,
            ),
            None => None,
        };

        let mut tx = self.pool.begin().await?;

        let public_id = cuid2::cuid();
        let now = now_timestamp();
        let product_id = sqlx::query(
            r#"
            INSERT INTO products (public_id, sku, name, description, category_id, price_cents, stock_quantity,
                                  reorder_level, requires_prescription, woo_product_id, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, true, ?, ?)
            "#,
        )
        .bind(&public_id)
        .bind(sku)
        .bind(name)
        .bind(&request.description)
        .bind(category_id)
        .bind(request.price_cents)
        .bind(request.initial_stock)
        .bind(request.reorder_level)
        .bind(request.requires_prescription)
        .bind(request.woo_product_id)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(|e| DatabaseError::from_insert(e, "product sku"))?
        .last_insert_rowid();

        if request.initial_stock > 0 {
            insert_movement(
                &mut tx,
                product_id,
                MovementType::Restock,
                request.initial_stock,
                request.initial_stock,
                Some("initial stock"),
                None,
            )
            .await?;
        }

        tx.commit().await?;
        info!(product_id = %public_id, sku, "product created");

        self.find_by_public_id(&public_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("product".into()))
    }

    pub async fn find_by_public_id(&self, public_id: &str) -> DatabaseResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!("{PRODUCT_SELECT} WHERE p.public_id = ?"))
            .bind(public_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    pub async fn list_all(&self) -> DatabaseResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!("{PRODUCT_SELECT} ORDER BY p.name ASC"))
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    /// Active products at or below their reorder level, emptiest first.
    pub async fn list_low_stock(&self) -> DatabaseResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "{PRODUCT_SELECT} WHERE p.is_active = true AND p.stock_quantity <= p.reorder_level \
             ORDER BY p.stock_quantity ASC, p.name ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    pub async fn count_low_stock(&self) -> DatabaseResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM products WHERE is_active = true AND stock_quantity <= reorder_level",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn create_category(&self, request: &NewCategory) -> DatabaseResult<Category> {
        let name = request.name.trim();
        let slug = slugify(name);
        if slug.is_empty() {
            return Err(DatabaseError::Validation("category name is required".into()));
        }

        let category = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (public_id, name, slug, description, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, public_id, name, slug, description, created_at
            "#,
        )
        .bind(cuid2::cuid())
        .bind(name)
        .bind(&slug)
        .bind(&request.description)
        .bind(now_timestamp())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_insert(e, "category"))?;

        Ok(category)
    }

    pub async fn list_categories(&self) -> DatabaseResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, public_id, name, slug, description, created_at FROM categories ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    /// Apply a signed stock change and record it as a movement.
    ///
    /// Fails with [`DatabaseError::InsufficientStock`] when the result would
    /// drop below zero.
    pub async fn adjust_stock(
        &self,
        product_public_id: &str,
        adjustment: &StockAdjustment,
    ) -> DatabaseResult<StockAdjustmentOutcome> {
        if adjustment.quantity_change == 0 {
            return Err(DatabaseError::Validation("quantity change cannot be zero".into()));
        }

        let now = now_timestamp();
        let mut tx = self.pool.begin().await?;

        // Write before reading so the transaction holds the write lock.
        let (product_id, sku, current, reorder_level): (i64, String, i64, i64) = sqlx::query_as(
            "UPDATE products SET updated_at = ? WHERE public_id = ? \
             RETURNING id, sku, stock_quantity, reorder_level",
        )
        .bind(&now)
        .bind(product_public_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("product".into()))?;

        let updated = current
            .checked_add(adjustment.quantity_change)
            .ok_or_else(|| DatabaseError::Validation("quantity change is out of range".into()))?;
        if updated < 0 {
            let requested = adjustment
                .quantity_change
                .checked_neg()
                .ok_or_else(|| DatabaseError::Validation("quantity change is out of range".into()))?;
            return Err(DatabaseError::InsufficientStock {
                sku,
                available: current,
                requested,
            });
        }

        sqlx::query("UPDATE products SET stock_quantity = ? WHERE id = ?")
            .bind(updated)
            .bind(product_id)
            .execute(&mut *tx)
            .await?;

        let movement = insert_movement(
            &mut tx,
            product_id,
            adjustment.movement_type,
            adjustment.quantity_change,
            updated,
            adjustment.reason.as_deref(),
            adjustment.reference.as_deref(),
        )
        .await?;

        tx.commit().await?;

        let crossed_reorder_level = current > reorder_level && updated <= reorder_level;
        if crossed_reorder_level {
            warn!(sku = %sku, stock = updated, reorder_level, "product fell to reorder level");
        }

        let product = self
            .find_by_public_id(product_public_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("product".into()))?;

        Ok(StockAdjustmentOutcome {
            product,
            movement,
            crossed_reorder_level,
        })
    }

    pub async fn movements_for_product(
        &self,
        product_public_id: &str,
        limit: i64,
    ) -> DatabaseResult<Vec<InventoryMovement>> {
        let product_id = sqlx::query_scalar::<_, i64>("SELECT id FROM products WHERE public_id = ?")
            .bind(product_public_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("product".into()))?;

        let movements = sqlx::query_as::<_, InventoryMovement>(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM inventory_movements WHERE product_id = ? \
             ORDER BY created_at DESC, id DESC LIMIT ?"
        ))
        .bind(product_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(movements)
    }
}

pub(crate) async fn insert_movement(
    tx: &mut Transaction<'_, Sqlite>,
    product_id: i64,
    movement_type: MovementType,
    quantity_change: i64,
    quantity_after: i64,
    reason: Option<&str>,
    reference: Option<&str>,
) -> DatabaseResult<InventoryMovement> {
    let movement = sqlx::query_as::<_, InventoryMovement>(&format!(
        r#"
        INSERT INTO inventory_movements (public_id, product_id, movement_type, quantity_change, quantity_after, reason, reference, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {MOVEMENT_COLUMNS}
        "#
    ))
    .bind(cuid2::cuid())
    .bind(product_id)
    .bind(movement_type)
    .bind(quantity_change)
    .bind(quantity_after)
    .bind(reason)
    .bind(reference)
    .bind(now_timestamp())
    .fetch_one(&mut **tx)
    .await?;
    Ok(movement)
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}
