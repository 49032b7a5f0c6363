use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::{debug, warn};

use super::models::{ExistingMatch, ProductEnvelope, ProductsPage, TargetProduct};
use crate::config::SyncConfig;
use crate::error::{Result, Service, SyncError};
use crate::providers::{body_as_json, truncate_for_log};
use crate::sync::TargetStore;

/// Largest page the products endpoint serves.
pub const PAGE_LIMIT: u32 = 250;

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// Shopify Admin REST client for products.
///
/// Key endpoints:
/// - GET  /admin/api/{version}/products.json?limit=250&fields=id,title,variants
/// - POST /admin/api/{version}/products.json
/// - PUT  /admin/api/{version}/products/{id}.json
#[derive(Debug, Clone)]
pub struct ShopifyProvider {
    base_url: String,
    api_version: String,
    access_token: String,
    http: Client,
}

impl ShopifyProvider {
    pub fn new(cfg: &SyncConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent("ShopifyProvider/1.0")
            .timeout(cfg.http_timeout)
            .build()
            .map_err(|e| SyncError::transport(Service::Shopify, e))?;

        Ok(Self {
            base_url: cfg.target_base_url.trim_end_matches('/').to_string(),
            api_version: cfg.shopify_api_version.clone(),
            access_token: cfg.shopify_token.clone(),
            http,
        })
    }

    fn admin_url(&self, path: &str) -> String {
        format!("{}/admin/api/{}/{}", self.base_url, self.api_version, path)
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        req.header(ACCESS_TOKEN_HEADER, &self.access_token)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
    }

    /// Send and return the body text of a 2xx response.
    async fn send(&self, req: RequestBuilder, what: &'static str) -> Result<String> {
        let resp = self
            .authed(req)
            .send()
            .await
            .map_err(|e| SyncError::transport(Service::Shopify, e))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| SyncError::transport(Service::Shopify, e))?;
        if !status.is_success() {
            warn!(
                target = "shopify",
                what,
                status = status.as_u16(),
                body = %truncate_for_log(text.clone(), 2000),
                "request rejected"
            );
            return Err(SyncError::Remote {
                service: Service::Shopify,
                status: status.as_u16(),
                body: body_as_json(&text),
            });
        }
        Ok(text)
    }

    /// One page (up to 250) of existing products with ids, titles and variants.
    pub async fn list_products(&self) -> Result<Vec<TargetProduct>> {
        let url = self.admin_url("products.json");
        debug!(target = "shopify", %url, "listing products");
        let limit = PAGE_LIMIT.to_string();
        let req = self
            .http
            .get(&url)
            .query(&[("limit", limit.as_str()), ("fields", "id,title,variants")]);
        let text = self.send(req, "list").await?;
        let page: ProductsPage = serde_json::from_str(&text).map_err(|source| SyncError::Decode {
            service: Service::Shopify,
            source,
        })?;
        if page.products.len() as u32 >= PAGE_LIMIT {
            warn!(
                target = "shopify",
                count = page.products.len(),
                "product listing hit the page limit; later pages are not consulted"
            );
        }
        Ok(page.products)
    }

    pub async fn create_product(&self, payload: &ProductEnvelope) -> Result<Option<ExistingMatch>> {
        let url = self.admin_url("products.json");
        let req = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .json(payload);
        let text = self.send(req, "create").await?;
        Ok(created_match(&body_as_json(&text)))
    }

    pub async fn update_product(&self, product_id: i64, payload: &ProductEnvelope) -> Result<()> {
        let url = self.admin_url(&format!("products/{product_id}.json"));
        let req = self
            .http
            .put(&url)
            .header(CONTENT_TYPE, "application/json")
            .json(payload);
        self.send(req, "update").await?;
        Ok(())
    }
}

/// Product and first variant id from a create response, when present.
fn created_match(body: &Value) -> Option<ExistingMatch> {
    Some(ExistingMatch {
        product_id: body.pointer("/product/id")?.as_i64()?,
        variant_id: body.pointer("/product/variants/0/id")?.as_i64()?,
    })
}

#[async_trait]
impl TargetStore for ShopifyProvider {
    async fn list_products(&self) -> Result<Vec<TargetProduct>> {
        ShopifyProvider::list_products(self).await
    }

    async fn create_product(&self, payload: &ProductEnvelope) -> Result<Option<ExistingMatch>> {
        ShopifyProvider::create_product(self, payload).await
    }

    async fn update_product(&self, product_id: i64, payload: &ProductEnvelope) -> Result<()> {
        ShopifyProvider::update_product(self, product_id, payload).await
    }
}
