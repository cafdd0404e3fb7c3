//! Public appointment, refill and transfer requests.
//!
//! Every submission upserts the customer by email, stores the request,
//! records a CRM interaction and raises an admin notification.

use chrono::Utc;
use pharmacy_database::{
    format_timestamp, AppointmentRepository, Customer, CustomerContact, CustomerRepository,
    InteractionRepository, InteractionType, NewAppointment, NewInteraction, NewNotification,
    NewPrescription, NotificationKind, NotificationRepository, PrescriptionKind,
    PrescriptionRepository,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{info, warn};
use utoipa::ToSchema;

use super::validation::{contact, ContactForm, Validator};
use super::ServiceError;

/// Author recorded on interactions created by public forms.
pub const WEBSITE_AUTHOR: &str = "website";

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AppointmentForm {
    #[serde(flatten)]
    pub contact: ContactForm,
    pub service_type: String,
    /// `YYYY-MM-DD`.
    pub preferred_date: String,
    /// `HH:MM`, 24 hour clock, UTC.
    pub preferred_time: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RefillForm {
    #[serde(flatten)]
    pub contact: ContactForm,
    pub prescription_number: String,
    pub medications: String,
    pub pickup_preference: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TransferForm {
    #[serde(flatten)]
    pub contact: ContactForm,
    pub previous_pharmacy_name: String,
    pub previous_pharmacy_phone: String,
    pub medications: String,
    pub prescription_number: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FormReceipt {
    /// Public id of the stored request.
    pub id: String,
    pub customer_id: String,
    pub status: String,
    pub submitted_at: String,
}

pub async fn submit_appointment(
    pool: &SqlitePool,
    form: AppointmentForm,
) -> Result<FormReceipt, ServiceError> {
    let now = Utc::now();
    let mut validator = Validator::new();
    let contact = contact(&mut validator, &form.contact, true, now.date_naive());
    let service_type = validator.required("service_type", &form.service_type);
    let scheduled_for = validator.future_datetime(
        "preferred_date",
        &form.preferred_date,
        &form.preferred_time,
        now,
    );
    let notes = validator.optional("notes", form.notes.as_deref());
    validator.finish()?;

    let scheduled_for = scheduled_for
        .map(format_timestamp)
        .ok_or_else(|| ServiceError::Validation(vec!["preferred_date: is required".into()]))?;

    let customer = CustomerRepository::new(pool.clone())
        .upsert_by_email(&contact)
        .await?;
    let appointment = AppointmentRepository::new(pool.clone())
        .create(
            customer.id,
            &NewAppointment {
                service_type: service_type.clone(),
                scheduled_for: scheduled_for.clone(),
                notes,
            },
        )
        .await?;

    record_submission(
        pool,
        &customer,
        format!("Appointment request: {service_type} on {scheduled_for}"),
        NewNotification {
            kind: NotificationKind::AppointmentRequest,
            title: "New appointment request".into(),
            message: format!(
                "{} requested {service_type} on {scheduled_for}",
                customer.full_name()
            ),
            reference: Some(appointment.public_id.clone()),
        },
    )
    .await;

    info!(appointment_id = %appointment.public_id, customer_id = %customer.public_id, "appointment form received");
    Ok(FormReceipt {
        id: appointment.public_id,
        customer_id: customer.public_id,
        status: appointment.status.to_string(),
        submitted_at: appointment.created_at,
    })
}

pub async fn submit_refill(pool: &SqlitePool, form: RefillForm) -> Result<FormReceipt, ServiceError> {
    let mut validator = Validator::new();
    let contact = contact(&mut validator, &form.contact, true, Utc::now().date_naive());
    let prescription_number = validator.required("prescription_number", &form.prescription_number);
    let medications = validator.required("medications", &form.medications);
    let pickup_preference = validator.optional("pickup_preference", form.pickup_preference.as_deref());
    let notes = validator.optional("notes", form.notes.as_deref());
    validator.finish()?;

    let request = NewPrescription {
        kind: PrescriptionKind::Refill,
        prescription_number: Some(prescription_number.clone()),
        medications,
        previous_pharmacy_name: None,
        previous_pharmacy_phone: None,
        pickup_preference,
        notes,
    };
    let summary = format!("Refill request for prescription {prescription_number}");
    submit_prescription(pool, &contact, request, summary).await
}

pub async fn submit_transfer(
    pool: &SqlitePool,
    form: TransferForm,
) -> Result<FormReceipt, ServiceError> {
    let mut validator = Validator::new();
    let contact = contact(&mut validator, &form.contact, true, Utc::now().date_naive());
    let previous_pharmacy_name =
        validator.required("previous_pharmacy_name", &form.previous_pharmacy_name);
    let previous_pharmacy_phone =
        validator.phone("previous_pharmacy_phone", &form.previous_pharmacy_phone);
    let medications = validator.required("medications", &form.medications);
    let prescription_number =
        validator.optional("prescription_number", form.prescription_number.as_deref());
    let notes = validator.optional("notes", form.notes.as_deref());
    validator.finish()?;

    let summary = format!("Transfer request from {previous_pharmacy_name}");
    let request = NewPrescription {
        kind: PrescriptionKind::Transfer,
        prescription_number,
        medications,
        previous_pharmacy_name: Some(previous_pharmacy_name),
        previous_pharmacy_phone: Some(previous_pharmacy_phone),
        pickup_preference: None,
        notes,
    };
    submit_prescription(pool, &contact, request, summary).await
}

async fn submit_prescription(
    pool: &SqlitePool,
    contact: &CustomerContact,
    request: NewPrescription,
    summary: String,
) -> Result<FormReceipt, ServiceError> {
    let customer = CustomerRepository::new(pool.clone())
        .upsert_by_email(contact)
        .await?;
    let prescription = PrescriptionRepository::new(pool.clone())
        .create(customer.id, &request)
        .await?;

    let (kind, title) = match request.kind {
        PrescriptionKind::Refill => (NotificationKind::RefillRequest, "New refill request"),
        PrescriptionKind::Transfer => (NotificationKind::TransferRequest, "New transfer request"),
    };
    record_submission(
        pool,
        &customer,
        summary,
        NewNotification {
            kind,
            title: title.into(),
            message: format!("{} submitted a {} request", customer.full_name(), request.kind),
            reference: Some(prescription.public_id.clone()),
        },
    )
    .await;

    info!(
        prescription_id = %prescription.public_id,
        kind = %request.kind,
        customer_id = %customer.public_id,
        "prescription form received"
    );
    Ok(FormReceipt {
        id: prescription.public_id,
        customer_id: customer.public_id,
        status: prescription.status.to_string(),
        submitted_at: prescription.created_at,
    })
}

/// CRM interaction and admin notification for a stored submission. Failures
/// are logged; the request itself is already persisted.
async fn record_submission(
    pool: &SqlitePool,
    customer: &Customer,
    summary: String,
    notification: NewNotification,
) {
    let interaction = NewInteraction {
        interaction_type: InteractionType::FormSubmission,
        summary,
        follow_up_at: None,
    };
    if let Err(error) = InteractionRepository::new(pool.clone())
        .create(customer.id, &interaction, WEBSITE_AUTHOR)
        .await
    {
        warn!(%error, customer_id = %customer.public_id, "failed to record form interaction");
    }

    if let Err(error) = NotificationRepository::new(pool.clone())
        .create(&notification)
        .await
    {
        warn!(%error, kind = %notification.kind, "failed to create notification");
    }
}
