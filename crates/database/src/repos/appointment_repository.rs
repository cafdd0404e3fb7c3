//! Appointment requests.

use sqlx::SqlitePool;
use tracing::info;

use crate::entities::appointment::{Appointment, AppointmentStatus, NewAppointment};
use crate::errors::{DatabaseError, DatabaseResult};
use crate::time::now_timestamp;

const APPOINTMENT_SELECT: &str = r#"
    SELECT a.id, a.public_id, a.customer_id, c.public_id AS customer_public_id,
           c.first_name || ' ' || c.last_name AS customer_name, c.email AS customer_email,
           a.service_type, a.scheduled_for, a.status, a.notes, a.created_at, a.updated_at
    FROM appointments a
    JOIN customers c ON c.id = a.customer_id
"#;

pub struct AppointmentRepository {
    pool: SqlitePool,
}

impl AppointmentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        customer_id: i64,
        request: &NewAppointment,
    ) -> DatabaseResult<Appointment> {
        if request.service_type.trim().is_empty() {
            return Err(DatabaseError::Validation("service type is required".into()));
        }

        let public_id = cuid2::cuid();
        let now = now_timestamp();
        sqlx::query(
            r#"
            INSERT INTO appointments (public_id, customer_id, service_type, scheduled_for, status, notes, created_at, updated_at)
            VALUES (?, ?, ?, ?, 'requested', ?, ?, ?)
            "#,
        )
        .bind(&public_id)
        .bind(customer_id)
        .bind(request.service_type.trim())
        .bind(&request.scheduled_for)
        .bind(&request.notes)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        info!(appointment_id = %public_id, scheduled_for = %request.scheduled_for, "appointment requested");
        self.find_by_public_id(&public_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("appointment".into()))
    }

    pub async fn find_by_public_id(&self, public_id: &str) -> DatabaseResult<Option<Appointment>> {
        let appointment = sqlx::query_as::<_, Appointment>(&format!(
            "{APPOINTMENT_SELECT} WHERE a.public_id = ?"
        ))
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(appointment)
    }

    /// Appointments ordered by scheduled time, optionally from `from` onwards.
    pub async fn list(
        &self,
        status: Option<AppointmentStatus>,
        from: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<Appointment>> {
        let appointments = sqlx::query_as::<_, Appointment>(&format!(
            "{APPOINTMENT_SELECT} WHERE (?1 IS NULL OR a.status = ?1) AND (?2 IS NULL OR a.scheduled_for >= ?2) \
             ORDER BY a.scheduled_for ASC, a.id ASC LIMIT ?3 OFFSET ?4"
        ))
        .bind(status)
        .bind(from)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(appointments)
    }

    pub async fn list_for_customer(&self, customer_id: i64) -> DatabaseResult<Vec<Appointment>> {
        let appointments = sqlx::query_as::<_, Appointment>(&format!(
            "{APPOINTMENT_SELECT} WHERE a.customer_id = ? ORDER BY a.scheduled_for DESC, a.id DESC"
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(appointments)
    }

    pub async fn update_status(
        &self,
        public_id: &str,
        next: AppointmentStatus,
    ) -> DatabaseResult<Appointment> {
        let current = sqlx::query_scalar::<_, AppointmentStatus>(
            "SELECT status FROM appointments WHERE public_id = ?",
        )
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("appointment".into()))?;

        if !current.can_transition_to(next) {
            return Err(DatabaseError::InvalidTransition {
                from: current.to_string(),
                to: next.to_string(),
            });
        }

        let result = sqlx::query(
            "UPDATE appointments SET status = ?, updated_at = ? WHERE public_id = ? AND status = ?",
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

        info!(appointment_id = %public_id, from = %current, to = %next, "appointment status changed");
        self.find_by_public_id(public_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("appointment".into()))
    }

    /// Requested or confirmed appointments scheduled at or after `now`.
    pub async fn count_upcoming(&self, now: &str) -> DatabaseResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM appointments WHERE scheduled_for >= ? AND status IN ('requested', 'confirmed')",
        )
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
