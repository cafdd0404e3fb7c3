//! Pharmacy database crate.
//!
//! Connection management, migrations, repositories for the CRM, inventory,
//! order and form tables, plus the shard manager and SQLite backups.

use pharmacy_config::DatabaseConfig;
use sqlx::SqlitePool;

pub mod backup;
pub mod connection;
pub mod entities;
pub mod errors;
pub mod migrations;
pub mod repos;
pub mod sharding;
pub mod time;

#[cfg(test)]
pub(crate) mod test_support;

pub use backup::{BackupManager, BackupRecord};
pub use connection::prepare_database;
pub use errors::{DatabaseError, DatabaseResult};
pub use migrations::{run_migrations, MIGRATOR};
pub use sharding::{rolling_hash, ShardHealth, ShardManager, ShardSelection};
pub use time::{format_timestamp, now_timestamp};

pub use entities::{
    appointment::{Appointment, AppointmentStatus, NewAppointment},
    customer::{
        Customer, CustomerContact, CustomerInteraction, CustomerListEntry, CustomerStatus,
        InteractionType, NewInteraction, UpdateCustomerRequest,
    },
    notification::{NewNotification, Notification, NotificationKind},
    order::{Order, OrderDetail, OrderItem, OrderLine, OrderStatus},
    prescription::{NewPrescription, Prescription, PrescriptionKind, PrescriptionStatus},
    product::{
        Category, InventoryMovement, MovementType, NewCategory, NewProduct, Product,
        StockAdjustment, StockAdjustmentOutcome,
    },
};

pub use repos::{
    AppointmentRepository, CustomerRepository, InteractionRepository, NotificationRepository,
    OrderRepository, PrescriptionRepository, ProductRepository,
};

/// Connect to the primary database and apply pending migrations.
pub async fn initialize_database(config: &DatabaseConfig) -> DatabaseResult<SqlitePool> {
    let pool = prepare_database(config)
        .await
        .map_err(|e| DatabaseError::Connection(format!("{e:#}")))?;

    run_migrations(&pool)
        .await
        .map_err(|e| DatabaseError::Migration(format!("{e:#}")))?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn initialize_database_applies_schema() {
        let temp_dir = TempDir::new().unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite://{}", temp_dir.path().join("init.db").display()),
            max_connections: 2,
        };

        let pool = initialize_database(&config).await.unwrap();

        let (tables,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('customers', 'products', 'orders', 'admin_sessions')",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(tables, 4);

        let (foreign_keys,): (bool,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert!(foreign_keys);
    }
}
