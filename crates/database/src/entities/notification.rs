//! Notifications shown in the admin backend.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::snake_case_enum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    AppointmentRequest,
    RefillRequest,
    TransferRequest,
    NewOrder,
    LowStock,
    SystemAlert,
}

snake_case_enum!(NotificationKind {
    AppointmentRequest => "appointment_request",
    RefillRequest => "refill_request",
    TransferRequest => "transfer_request",
    NewOrder => "new_order",
    LowStock => "low_stock",
    SystemAlert => "system_alert",
});

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Notification {
    #[serde(skip_serializing)]
    pub id: i64,
    pub public_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    /// Public id of the record this notification points at.
    pub reference: Option<String>,
    pub read_at: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub reference: Option<String>,
}
