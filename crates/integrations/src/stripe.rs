//! Stripe payment intents.

use std::collections::BTreeMap;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::{decode_json, ensure_success, trim_base, IntegrationError};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

#[derive(Clone)]
pub struct StripeClient {
    http: Client,
    base_url: String,
    secret_key: String,
}

impl StripeClient {
    pub fn new(http: Client, base_url: &str, secret_key: &str) -> Self {
        Self {
            http,
            base_url: trim_base(base_url),
            secret_key: secret_key.to_string(),
        }
    }

    /// Create a payment intent for `amount_cents` in the smallest currency unit.
    ///
    /// Metadata entries are sent as `metadata[key]=value` form fields.
    pub async fn create_payment_intent(
        &self,
        amount_cents: i64,
        currency: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<PaymentIntent, IntegrationError> {
        if amount_cents <= 0 {
            return Err(IntegrationError::InvalidRequest(
                "payment amount must be positive".into(),
            ));
        }

        let mut form: Vec<(String, String)> = vec![
            ("amount".into(), amount_cents.to_string()),
            ("currency".into(), currency.to_ascii_lowercase()),
            ("automatic_payment_methods[enabled]".into(), "true".into()),
        ];
        form.extend(
            metadata
                .iter()
                .map(|(key, value)| (format!("metadata[{key}]"), value.clone())),
        );

        let response = self
            .http
            .post(format!("{}/v1/payment_intents", self.base_url))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await?;
        let intent: PaymentIntent = decode_json(ensure_success(response).await?).await?;

        info!(intent = %intent.id, amount = intent.amount, currency = %intent.currency, "payment intent created");
        Ok(intent)
    }
}
