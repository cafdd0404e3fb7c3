//! Refill and transfer requests.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::snake_case_enum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PrescriptionKind {
    Refill,
    Transfer,
}

snake_case_enum!(PrescriptionKind {
    Refill => "refill",
    Transfer => "transfer",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PrescriptionStatus {
    Pending,
    InReview,
    Ready,
    Completed,
    Rejected,
}

snake_case_enum!(PrescriptionStatus {
    Pending => "pending",
    InReview => "in_review",
    Ready => "ready",
    Completed => "completed",
    Rejected => "rejected",
});

impl PrescriptionStatus {
    pub fn can_transition_to(self, next: PrescriptionStatus) -> bool {
        use PrescriptionStatus::*;
        matches!(
            (self, next),
            (Pending, InReview)
                | (Pending, Rejected)
                | (InReview, Ready)
                | (InReview, Rejected)
                | (Ready, Completed)
        )
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Prescription {
    #[serde(skip_serializing)]
    pub id: i64,
    pub public_id: String,
    #[serde(skip_serializing)]
    pub customer_id: i64,
    pub customer_public_id: String,
    pub customer_name: String,
    pub customer_email: String,
    pub kind: PrescriptionKind,
    pub status: PrescriptionStatus,
    pub prescription_number: Option<String>,
    pub medications: String,
    pub previous_pharmacy_name: Option<String>,
    pub previous_pharmacy_phone: Option<String>,
    pub pickup_preference: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewPrescription {
    pub kind: PrescriptionKind,
    pub prescription_number: Option<String>,
    pub medications: String,
    pub previous_pharmacy_name: Option<String>,
    pub previous_pharmacy_phone: Option<String>,
    pub pickup_preference: Option<String>,
    pub notes: Option<String>,
}
