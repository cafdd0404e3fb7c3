//! Outbound HTTP clients.
//!
//! Each client exists only when its configuration is present; callers get
//! [`IntegrationError::NotConfigured`] from [`Integrations`] otherwise.

use std::time::Duration;

use pharmacy_config::IntegrationsConfig;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

pub mod stripe;
pub mod woocommerce;
pub mod wordpress;

pub use stripe::{PaymentIntent, StripeClient};
pub use woocommerce::{ProductQuery, WooCategory, WooCommerceClient, WooProduct};
pub use wordpress::{BlogPost, PostQuery, WordPressClient};

/// Largest page size WordPress and WooCommerce accept.
pub const MAX_PER_PAGE: u32 = 100;

const USER_AGENT: &str = concat!("pharmacy-backend/", env!("CARGO_PKG_VERSION"));
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("{0} integration is not configured")]
    NotConfigured(&'static str),
    #[error("{0}")]
    InvalidRequest(String),
    #[error("upstream request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("{0} not found")]
    NotFound(String),
    #[error("invalid upstream response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// One page of an upstream collection. Totals come from the `X-WP-Total`
/// and `X-WP-TotalPages` headers when present.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: Option<u64>,
    pub total_pages: Option<u64>,
}

#[derive(Clone, Default)]
pub struct Integrations {
    woocommerce: Option<WooCommerceClient>,
    wordpress: Option<WordPressClient>,
    stripe: Option<StripeClient>,
}

impl Integrations {
    pub fn from_config(config: &IntegrationsConfig) -> Result<Self, IntegrationError> {
        let http = build_http_client(Duration::from_secs(config.request_timeout_seconds.max(1)))?;

        let woocommerce = match (
            config.woocommerce.base_url.as_deref(),
            config.woocommerce.consumer_key.as_deref(),
            config.woocommerce.consumer_secret.as_deref(),
        ) {
            (Some(base), Some(key), Some(secret)) => {
                Some(WooCommerceClient::new(http.clone(), base, key, secret))
            }
            (Some(_), _, _) => {
                warn!("woocommerce base_url is set without consumer credentials, catalog disabled");
                None
            }
            _ => None,
        };

        let wordpress = config
            .wordpress
            .base_url
            .as_deref()
            .map(|base| WordPressClient::new(http.clone(), base));

        let stripe = config
            .stripe
            .secret_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .map(|key| StripeClient::new(http.clone(), &config.stripe.base_url, key));

        info!(
            woocommerce = woocommerce.is_some(),
            wordpress = wordpress.is_some(),
            stripe = stripe.is_some(),
            "integrations initialised"
        );

        Ok(Self {
            woocommerce,
            wordpress,
            stripe,
        })
    }

    pub fn with_woocommerce(mut self, client: WooCommerceClient) -> Self {
        self.woocommerce = Some(client);
        self
    }

    pub fn with_wordpress(mut self, client: WordPressClient) -> Self {
        self.wordpress = Some(client);
        self
    }

    pub fn with_stripe(mut self, client: StripeClient) -> Self {
        self.stripe = Some(client);
        self
    }

    pub fn woocommerce(&self) -> Result<&WooCommerceClient, IntegrationError> {
        self.woocommerce
            .as_ref()
            .ok_or(IntegrationError::NotConfigured("woocommerce"))
    }

    pub fn wordpress(&self) -> Result<&WordPressClient, IntegrationError> {
        self.wordpress
            .as_ref()
            .ok_or(IntegrationError::NotConfigured("wordpress"))
    }

    pub fn stripe(&self) -> Option<&StripeClient> {
        self.stripe.as_ref()
    }
}

pub fn build_http_client(timeout: Duration) -> Result<Client, IntegrationError> {
    Ok(Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()?)
}

pub(crate) fn clamp_per_page(per_page: Option<u32>, default: u32) -> u32 {
    per_page.unwrap_or(default).clamp(1, MAX_PER_PAGE)
}

pub(crate) fn trim_base(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Turn a non-success status into [`IntegrationError::Upstream`], keeping a
/// bounded prefix of the body for diagnostics.
pub(crate) async fn ensure_success(response: Response) -> Result<Response, IntegrationError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    warn!(status = status.as_u16(), "upstream request failed");
    Err(IntegrationError::Upstream {
        status: status.as_u16(),
        body,
    })
}

pub(crate) async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, IntegrationError> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

pub(crate) fn header_u64(response: &Response, name: &str) -> Option<u64> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

pub(crate) fn is_not_found(response: &Response) -> bool {
    response.status() == StatusCode::NOT_FOUND
}

#[cfg(test)]
mod tests {
    use super::*;
    use pharmacy_config::{StripeConfig, WooCommerceConfig, WordPressConfig};

    #[test]
    fn per_page_is_clamped_to_upstream_limits() {
        assert_eq!(clamp_per_page(None, 20), 20);
        assert_eq!(clamp_per_page(Some(0), 20), 1);
        assert_eq!(clamp_per_page(Some(500), 20), 100);
        assert_eq!(clamp_per_page(Some(42), 20), 42);
    }

    #[test]
    fn clients_are_built_only_when_configured() {
        let empty = Integrations::from_config(&IntegrationsConfig::default()).unwrap();
        assert!(matches!(empty.woocommerce(), Err(IntegrationError::NotConfigured("woocommerce"))));
        assert!(matches!(empty.wordpress(), Err(IntegrationError::NotConfigured("wordpress"))));
        assert!(empty.stripe().is_none());

        let config = IntegrationsConfig {
            woocommerce: WooCommerceConfig {
                base_url: Some("https://shop.example.com".into()),
                consumer_key: None,
                consumer_secret: None,
            },
            wordpress: WordPressConfig {
                base_url: Some("https://blog.example.com/".into()),
            },
            stripe: StripeConfig {
                secret_key: Some("sk_test_123".into()),
                ..StripeConfig::default()
            },
            ..IntegrationsConfig::default()
        };
        let partial = Integrations::from_config(&config).unwrap();
        assert!(partial.woocommerce().is_err());
        assert!(partial.wordpress().is_ok());
        assert!(partial.stripe().is_some());
    }
}
