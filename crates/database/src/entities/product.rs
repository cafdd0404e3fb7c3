//! Catalog products, categories and stock movements.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::snake_case_enum;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Category {
    #[serde(skip_serializing)]
    pub id: i64,
    pub public_id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Product {
    #[serde(skip_serializing)]
    pub id: i64,
    pub public_id: String,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category_name: Option<String>,
    pub price_cents: i64,
    pub stock_quantity: i64,
    pub reorder_level: i64,
    pub low_stock: bool,
    pub requires_prescription: bool,
    pub woo_product_id: Option<i64>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    /// Public id of an existing category.
    pub category_id: Option<String>,
    pub price_cents: i64,
    #[serde(default)]
    pub initial_stock: i64,
    #[serde(default)]
    pub reorder_level: i64,
    #[serde(default)]
    pub requires_prescription: bool,
    pub woo_product_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    Restock,
    Sale,
    Adjustment,
    Return,
    Expired,
    Damaged,
}

snake_case_enum!(MovementType {
    Restock => "restock",
    Sale => "sale",
    Adjustment => "adjustment",
    Return => "return",
    Expired => "expired",
    Damaged => "damaged",
});

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct InventoryMovement {
    #[serde(skip_serializing)]
    pub id: i64,
    pub public_id: String,
    #[serde(skip_serializing)]
    pub product_id: i64,
    pub movement_type: MovementType,
    pub quantity_change: i64,
    pub quantity_after: i64,
    pub reason: Option<String>,
    pub reference: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StockAdjustment {
    /// Signed change applied to the current quantity.
    pub quantity_change: i64,
    pub movement_type: MovementType,
    pub reason: Option<String>,
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StockAdjustmentOutcome {
    pub product: Product,
    pub movement: InventoryMovement,
    /// True when this adjustment took the product from above its reorder
    /// level to at or below it.
    pub crossed_reorder_level: bool,
}
