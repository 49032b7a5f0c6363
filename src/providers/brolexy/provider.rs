use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::{debug, info, warn};

use super::signature::SignedTime;
use crate::config::SyncConfig;
use crate::error::{Result, Service, SyncError};
use crate::providers::{body_as_json, truncate_for_log};
use crate::sync::SourceCatalog;

/// Brolexy catalog client.
///
/// Endpoint: GET {base}/api/products
///
/// Headers on every request:
/// - publicKey: account public key
/// - time: Unix seconds
/// - signature: base64 HMAC-SHA256 of `time` under the secret key
/// - Content-Type: application/json
#[derive(Debug, Clone)]
pub struct BrolexyProvider {
    base_url: String,
    public_key: String,
    secret_key: String,
    http: Client,
}

/// Brolexy product id; the API has returned both numbers and strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductId {
    Number(i64),
    Text(String),
}

impl ProductId {
    /// Numeric when the text is an integer, verbatim otherwise.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        raw.parse::<i64>()
            .map(ProductId::Number)
            .unwrap_or_else(|_| ProductId::Text(raw.to_string()))
    }

    fn is_blank(&self) -> bool {
        matches!(self, ProductId::Text(s) if s.trim().is_empty())
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductId::Number(n) => write!(f, "{n}"),
            ProductId::Text(s) => f.write_str(s.trim()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceProduct {
    pub product_id: ProductId,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub in_stock: Option<i64>,
}

/// Result of one catalog fetch. `skipped` counts records that could not be used.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOutcome {
    pub products: Vec<SourceProduct>,
    pub skipped: usize,
}

impl BrolexyProvider {
    pub fn new(cfg: &SyncConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent("BrolexyProvider/1.0")
            .timeout(cfg.http_timeout)
            .build()
            .map_err(|e| SyncError::transport(Service::Brolexy, e))?;

        Ok(Self {
            base_url: cfg.source_base_url.trim_end_matches('/').to_string(),
            public_key: cfg.bro_public_key.clone(),
            secret_key: cfg.bro_secret_key.clone(),
            http,
        })
    }

    /// Fetch the full catalog with a freshly signed request.
    pub async fn fetch_products(&self) -> Result<FetchOutcome> {
        let signed = SignedTime::now(&self.secret_key)?;
        let url = format!("{}/api/products", self.base_url);
        debug!(target = "brolexy", %url, time = signed.time, "fetching products");

        let resp = self
            .http
            .get(&url)
            .header("publicKey", &self.public_key)
            .header("time", signed.time.to_string())
            .header("signature", &signed.signature)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| SyncError::transport(Service::Brolexy, e))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| SyncError::transport(Service::Brolexy, e))?;
        if !status.is_success() {
            warn!(
                target = "brolexy",
                status = status.as_u16(),
                body = %truncate_for_log(text.clone(), 2000),
                "product fetch rejected"
            );
            return Err(SyncError::Remote {
                service: Service::Brolexy,
                status: status.as_u16(),
                body: body_as_json(&text),
            });
        }

        let outcome = decode_products(&text)?;
        info!(
            target = "brolexy",
            found = outcome.products.len(),
            skipped = outcome.skipped,
            "products fetched"
        );
        Ok(outcome)
    }
}

#[async_trait]
impl SourceCatalog for BrolexyProvider {
    async fn fetch_products(&self) -> Result<FetchOutcome> {
        BrolexyProvider::fetch_products(self).await
    }
}

/// Decode a catalog body. The body itself must be a JSON array; records are
/// decoded one at a time and unusable ones are skipped rather than failing the batch.
pub fn decode_products(text: &str) -> Result<FetchOutcome> {
    let raw: Vec<Value> = serde_json::from_str(text).map_err(|source| SyncError::Decode {
        service: Service::Brolexy,
        source,
    })?;

    let mut outcome = FetchOutcome::default();
    for (idx, item) in raw.into_iter().enumerate() {
        match serde_json::from_value::<SourceProduct>(item) {
            Ok(p) if p.product_id.is_blank() || p.name.trim().is_empty() => {
                warn!(target = "brolexy", idx, "skipping record with blank productId or name");
                outcome.skipped += 1;
            }
            Ok(p) => outcome.products.push(p),
            Err(e) => {
                warn!(target = "brolexy", idx, error = %e, "skipping malformed record");
                outcome.skipped += 1;
            }
        }
    }
    Ok(outcome)
}
