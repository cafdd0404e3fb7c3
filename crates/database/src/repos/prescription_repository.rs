//! Refill and transfer requests.

use sqlx::SqlitePool;
use tracing::info;

use crate::entities::prescription::{
    NewPrescription, Prescription, PrescriptionKind, PrescriptionStatus,
};
use crate::errors::{DatabaseError, DatabaseResult};
use crate::time::now_timestamp;

const PRESCRIPTION_SELECT: &str = r#"
    SELECT r.id, r.public_id, r.customer_id, c.public_id AS customer_public_id,
           c.first_name || ' ' || c.last_name AS customer_name, c.email AS customer_email,
           r.kind, r.status, r.prescription_number, r.medications, r.previous_pharmacy_name,
           r.previous_pharmacy_phone, r.pickup_preference, r.notes, r.created_at, r.updated_at
    FROM prescriptions r
    JOIN customers c ON c.id = r.customer_id
"#;

pub struct PrescriptionRepository {
    pool: SqlitePool,
}

impl PrescriptionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        customer_id: i64,
        request: &NewPrescription,
    ) -> DatabaseResult<Prescription> {
        if request.medications.trim().is_empty() {
            return Err(DatabaseError::Validation("medications are required".into()));
        }

        let public_id = cuid2::cuid();
        let now = now_timestamp();
        sqlx::query(
            r#"
            INSERT INTO prescriptions (public_id, customer_id, kind, status, prescription_number, medications,
                                       previous_pharmacy_name, previous_pharmacy_phone, pickup_preference, notes,
                                       created_at, updated_at)
            VALUES (?, ?, ?, 'pending', ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&public_id)
        .bind(customer_id)
        .bind(request.kind)
        .bind(&request.prescription_number)
        .bind(request.medications.trim())
        .bind(&request.previous_pharmacy_name)
        .bind(&request.previous_pharmacy_phone)
        .bind(&request.pickup_preference)
        .bind(&request.notes)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        info!(request_id = %public_id, kind = %request.kind, "prescription request stored");
        self.find_by_public_id(&public_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("prescription".into()))
    }

    pub async fn find_by_public_id(&self, public_id: &str) -> DatabaseResult<Option<Prescription>> {
        let prescription = sqlx::query_as::<_, Prescription>(&format!(
            "{PRESCRIPTION_SELECT} WHERE r.public_id = ?"
        ))
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(prescription)
    }

    pub async fn list(
        &self,
        kind: Option<PrescriptionKind>,
        status: Option<PrescriptionStatus>,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<Prescription>> {
        let prescriptions = sqlx::query_as::<_, Prescription>(&format!(
            "{PRESCRIPTION_SELECT} WHERE (?1 IS NULL OR r.kind = ?1) AND (?2 IS NULL OR r.status = ?2) \
             ORDER BY r.created_at DESC, r.id DESC LIMIT ?3 OFFSET ?4"
        ))
        .bind(kind)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(prescriptions)
    }

    pub async fn list_for_customer(&self, customer_id: i64) -> DatabaseResult<Vec<Prescription>> {
        let prescriptions = sqlx::query_as::<_, Prescription>(&format!(
            "{PRESCRIPTION_SELECT} WHERE r.customer_id = ? ORDER BY r.created_at DESC, r.id DESC"
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(prescriptions)
    }

    pub async fn update_status(
        &self,
        public_id: &str,
        next: PrescriptionStatus,
    ) -> DatabaseResult<Prescription> {
        let current = sqlx::query_scalar::<_, PrescriptionStatus>(
            "SELECT status FROM prescriptions WHERE public_id = ?",
        )
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("prescription".into()))?;

        if !current.can_transition_to(next) {
            return Err(DatabaseError::InvalidTransition {
                from: current.to_string(),
                to: next.to_string(),
            });
        }

        // Compare-and-set against the status read above.
        let result = sqlx::query(
            "UPDATE prescriptions SET status = ?, updated_at = ? WHERE public_id = ? AND status = ?",
        )
        .bind(next)
        .bind(now_timestamp())
        .bind(public_id)
        .bind(current)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::InvalidTransition {
                from: current.to_string(),
                to: next.to_string(),
            });
        }

        info!(request_id = %public_id, from = %current, to = %next, "prescription status changed");
        self.find_by_public_id(public_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("prescription".into()))
    }

    pub async fn count_by_status(&self, status: PrescriptionStatus) -> DatabaseResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM prescriptions WHERE status = ?")
            .bind(status)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
