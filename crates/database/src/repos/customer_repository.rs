//! Customer and interaction persistence.

use sqlx::SqlitePool;
use tracing::info;

use super::like_pattern;
use crate::entities::customer::{
    Customer, CustomerContact, CustomerInteraction, CustomerListEntry, NewInteraction,
    UpdateCustomerRequest,
};
use crate::errors::{DatabaseError, DatabaseResult};
use crate::time::now_timestamp;

const CUSTOMER_COLUMNS: &str = "c.id, c.public_id, c.email, c.first_name, c.last_name, c.phone, \
     c.date_of_birth, c.status, c.notes, c.created_at, c.updated_at";

pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a customer or refresh the contact details of the existing one.
    ///
    /// Email matching is case-insensitive. Missing phone or birth date never
    /// erase values captured earlier.
    pub async fn upsert_by_email(&self, contact: &CustomerContact) -> DatabaseResult<Customer> {
        let now = now_timestamp();
        let email = contact.email.trim();

        let customer = sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (public_id, email, first_name, last_name, phone, date_of_birth, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, 'active', ?, ?)
            ON CONFLICT(email) DO UPDATE SET
                first_name = excluded.first_name,
                last_name = excluded.last_name,
                phone = COALESCE(excluded.phone, customers.phone),
                date_of_birth = COALESCE(excluded.date_of_birth, customers.date_of_birth),
                updated_at = excluded.updated_at
            RETURNING id, public_id, email, first_name, last_name, phone, date_of_birth, status, notes, created_at, updated_at
            "#,
        )
        .bind(cuid2::cuid())
        .bind(email)
        .bind(contact.first_name.trim())
        .bind(contact.last_name.trim())
        .bind(&contact.phone)
        .bind(&contact.date_of_birth)
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool)
        .await?;

        info!(customer_id = %customer.public_id, "customer upserted");
        Ok(customer)
    }

    pub async fn find_by_public_id(&self, public_id: &str) -> DatabaseResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers c WHERE c.public_id = ?"
        ))
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(customer)
    }

    pub async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers c WHERE c.email = ?"
        ))
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await?;
        Ok(customer)
    }

    /// Newest customers first, optionally filtered by name, email or phone.
    pub async fn list(
        &self,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<CustomerListEntry>> {
        let pattern = like_pattern(search);
        let entries = sqlx::query_as::<_, CustomerListEntry>(&format!(
            r#"
            SELECT {CUSTOMER_COLUMNS},
                   (SELECT COUNT(*) FROM orders o WHERE o.customer_id = c.id) AS order_count,
                   (SELECT MAX(i.created_at) FROM customer_interactions i WHERE i.customer_id = c.id) AS last_interaction_at
            FROM customers c
            WHERE ?1 IS NULL
               OR c.email LIKE ?1
               OR c.first_name LIKE ?1
               OR c.last_name LIKE ?1
               OR c.phone LIKE ?1
            ORDER BY c.created_at DESC, c.id DESC
            LIMIT ?2 OFFSET ?3
            "#
        ))
        .bind(pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    pub async fn count(&self, search: Option<&str>) -> DatabaseResult<i64> {
        let pattern = like_pattern(search);
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM customers c
            WHERE ?1 IS NULL
               OR c.email LIKE ?1
               OR c.first_name LIKE ?1
               OR c.last_name LIKE ?1
               OR c.phone LIKE ?1
            "#,
        )
        .bind(pattern)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn update(
        &self,
        public_id: &str,
        request: &UpdateCustomerRequest,
    ) -> DatabaseResult<Customer> {
        let result = sqlx::query(
            r#"
            UPDATE customers SET
                status = COALESCE(?, status),
                notes = COALESCE(?, notes),
                phone = COALESCE(?, phone),
                updated_at = ?
            WHERE public_id = ?
            "#,
        )
        .bind(request.status)
        .bind(&request.notes)
        .bind(&request.phone)
        .bind(now_timestamp())
        .bind(public_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("customer".into()));
        }

        self.find_by_public_id(public_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("customer".into()))
    }
}

pub struct InteractionRepository {
    pool: SqlitePool,
}

impl InteractionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        customer_id: i64,
        request: &NewInteraction,
        created_by: &str,
    ) -> DatabaseResult<CustomerInteraction> {
        if request.summary.trim().is_empty() {
            return Err(DatabaseError::Validation("summary is required".into()));
        }

        let interaction = sqlx::query_as::<_, CustomerInteraction>(
            r#"
            INSERT INTO customer_interactions (public_id, customer_id, interaction_type, summary, follow_up_at, created_by, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id, public_id, customer_id, interaction_type, summary, follow_up_at, created_by, created_at
            "#,
        )
        .bind(cuid2::cuid())
        .bind(customer_id)
        .bind(request.interaction_type)
        .bind(request.summary.trim())
        .bind(&request.follow_up_at)
        .bind(created_by)
        .bind(now_timestamp())
        .fetch_one(&self.pool)
        .await?;

        Ok(interaction)
    }

    pub async fn list_for_customer(
        &self,
        customer_id: i64,
    ) -> DatabaseResult<Vec<CustomerInteraction>> {
        let interactions = sqlx::query_as::<_, CustomerInteraction>(
            r#"
            SELECT id, public_id, customer_id, interaction_type, summary, follow_up_at, created_by, created_at
            FROM customer_interactions
            WHERE customer_id = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(interactions)
    }
}
