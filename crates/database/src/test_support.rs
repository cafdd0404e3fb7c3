use pharmacy_config::DatabaseConfig;
use sqlx::SqlitePool;
use tempfile::TempDir;

use crate::{initialize_database, CustomerContact, CustomerRepository, Customer};

pub(crate) async fn test_pool() -> (SqlitePool, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let config = DatabaseConfig {
        url: format!("sqlite://{}", temp_dir.path().join("test.db").display()),
        max_connections: 4,
    };
    let pool = initialize_database(&config).await.unwrap();
    (pool, temp_dir)
}

pub(crate) async fn seed_customer(pool: &SqlitePool, email: &str) -> Customer {
    CustomerRepository::new(pool.clone())
        .upsert_by_email(&CustomerContact {
            email: email.to_string(),
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            phone: Some("5551234567".into()),
            date_of_birth: None,
        })
        .await
        .unwrap()
}
