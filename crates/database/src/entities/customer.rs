//! Customers and CRM interactions.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::snake_case_enum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CustomerStatus {
    Active,
    Inactive,
    Blocked,
}

snake_case_enum!(CustomerStatus {
    Active => "active",
    Inactive => "inactive",
    Blocked => "blocked",
});

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Customer {
    #[serde(skip_serializing, default)]
    pub id: i64,
    pub public_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub date_of_birth: Option<String>,
    pub status: CustomerStatus,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Customer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A customer row with CRM aggregates for list views.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct CustomerListEntry {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub customer: Customer,
    pub order_count: i64,
    pub last_interaction_at: Option<String>,
}

/// Contact details captured by a public form. Used to create or refresh a customer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CustomerContact {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub date_of_birth: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateCustomerRequest {
    pub status: Option<CustomerStatus>,
    pub notes: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    Call,
    Email,
    Visit,
    Note,
    FormSubmission,
}

snake_case_enum!(InteractionType {
    Call => "call",
    Email => "email",
    Visit => "visit",
    Note => "note",
    FormSubmission => "form_submission",
});

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct CustomerInteraction {
    #[serde(skip_serializing)]
    pub id: i64,
    pub public_id: String,
    #[serde(skip_serializing)]
    pub customer_id: i64,
    pub interaction_type: InteractionType,
    pub summary: String,
    pub follow_up_at: Option<String>,
    pub created_by: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewInteraction {
    pub interaction_type: InteractionType,
    pub summary: String,
    pub follow_up_at: Option<String>,
}
