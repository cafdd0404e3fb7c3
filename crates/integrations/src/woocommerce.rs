//! WooCommerce REST API (`/wp-json/wc/v3`).

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::{IntoParams, ToSchema};

use crate::{clamp_per_page, decode_json, ensure_success, header_u64, is_not_found, trim_base};
use crate::{IntegrationError, Page};

const DEFAULT_PER_PAGE: u32 = 20;

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// WooCommerce category id.
    pub category: Option<u64>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WooCategoryRef {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WooImage {
    pub src: String,
    #[serde(default)]
    pub alt: String,
}

/// The subset of a WooCommerce product the storefront renders.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WooProduct {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub regular_price: String,
    #[serde(default)]
    pub sale_price: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub stock_status: String,
    pub stock_quantity: Option<i64>,
    #[serde(default)]
    pub categories: Vec<WooCategoryRef>,
    #[serde(default)]
    pub images: Vec<WooImage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WooCategory {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub count: u64,
}

#[derive(Clone)]
pub struct WooCommerceClient {
    http: Client,
    base_url: String,
    consumer_key: String,
    consumer_secret: String,
}

impl WooCommerceClient {
    pub fn new(http: Client, base_url: &str, consumer_key: &str, consumer_secret: &str) -> Self {
        Self {
            http,
            base_url: format!("{}/wp-json/wc/v3", trim_base(base_url)),
            consumer_key: consumer_key.to_string(),
            consumer_secret: consumer_secret.to_string(),
        }
    }

    pub async fn list_products(&self, query: &ProductQuery) -> Result<Page<WooProduct>, IntegrationError> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = clamp_per_page(query.per_page, DEFAULT_PER_PAGE);

        let mut params: Vec<(&str, String)> = vec![
            ("page", page.to_string()),
            ("per_page", per_page.to_string()),
            ("status", "publish".to_string()),
        ];
        if let Some(category) = query.category {
            params.push(("category", category.to_string()));
        }
        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            params.push(("search", search.to_string()));
        }

        debug!(page, per_page, "listing woocommerce products");
        let response = self
            .http
            .get(format!("{}/products", self.base_url))
            .basic_auth(&self.consumer_key, Some(&self.consumer_secret))
            .query(&params)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let total = header_u64(&response, "x-wp-total");
        let total_pages = header_u64(&response, "x-wp-totalpages");
        let items = decode_json(response).await?;

        Ok(Page {
            items,
            page,
            per_page,
            total,
            total_pages,
        })
    }

    pub async fn get_product(&self, id: u64) -> Result<WooProduct, IntegrationError> {
        let response = self
            .http
            .get(format!("{}/products/{id}", self.base_url))
            .basic_auth(&self.consumer_key, Some(&self.consumer_secret))
            .send()
            .await?;

        if is_not_found(&response) {
            return Err(IntegrationError::NotFound(format!("product {id}")));
        }
        decode_json(ensure_success(response).await?).await
    }

    pub async fn list_categories(&self) -> Result<Vec<WooCategory>, IntegrationError> {
        let response = self
            .http
            .get(format!("{}/products/categories", self.base_url))
            .basic_auth(&self.consumer_key, Some(&self.consumer_secret))
            .query(&[("per_page", crate::MAX_PER_PAGE.to_string()), ("hide_empty", "true".to_string())])
            .send()
            .await?;
        decode_json(ensure_success(response).await?).await
    }
}
