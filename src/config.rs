//! Sync configuration, read once at startup and passed explicitly to the providers.
//!
//! Environment Variables:
//! - BRO_PUBLIC_KEY / BRO_SECRET_KEY: Brolexy credentials (required)
//! - BRO_ENV: `prod`/`production` selects the live API, anything else the dev API
//! - BRO_BASE_URL: explicit Brolexy base URL (wins over BRO_ENV)
//! - SHOPIFY_STORE / SHOPIFY_TOKEN: shop subdomain and Admin API token (required)
//! - SHOPIFY_API_VERSION: admin API version, default 2025-01
//! - SHOPIFY_BASE_URL: explicit Shopify base URL (wins over SHOPIFY_STORE host)
//! - SKU_PREFIX: derived SKU prefix, default BRO-; set but empty means no prefix
//! - HTTP_TIMEOUT_SECS: per-request timeout, default 30
//! - SYNC_DRY_RUN: plan only, no writes
use std::fmt;
use std::time::Duration;

use crate::error::{Result, SyncError};
use crate::util::env;

pub const BRO_PUBLIC_KEY: &str = "BRO_PUBLIC_KEY";
pub const BRO_SECRET_KEY: &str = "BRO_SECRET_KEY";
pub const BRO_ENV: &str = "BRO_ENV";
pub const BRO_BASE_URL: &str = "BRO_BASE_URL";
pub const SHOPIFY_STORE: &str = "SHOPIFY_STORE";
pub const SHOPIFY_TOKEN: &str = "SHOPIFY_TOKEN";
pub const SHOPIFY_API_VERSION: &str = "SHOPIFY_API_VERSION";
pub const SHOPIFY_BASE_URL: &str = "SHOPIFY_BASE_URL";
pub const SKU_PREFIX: &str = "SKU_PREFIX";
pub const HTTP_TIMEOUT_SECS: &str = "HTTP_TIMEOUT_SECS";
pub const SYNC_DRY_RUN: &str = "SYNC_DRY_RUN";

pub const REQUIRED_KEYS: [&str; 4] = [BRO_PUBLIC_KEY, BRO_SECRET_KEY, SHOPIFY_STORE, SHOPIFY_TOKEN];
pub const OPTIONAL_KEYS: [&str; 7] = [
    BRO_ENV,
    BRO_BASE_URL,
    SHOPIFY_API_VERSION,
    SHOPIFY_BASE_URL,
    SKU_PREFIX,
    HTTP_TIMEOUT_SECS,
    SYNC_DRY_RUN,
];

pub const DEFAULT_API_VERSION: &str = "2025-01";
pub const DEFAULT_SKU_PREFIX: &str = "BRO-";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEnvironment {
    Staging,
    Production,
}

impl SourceEnvironment {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("prod") | Some("production") | Some("live") => SourceEnvironment::Production,
            _ => SourceEnvironment::Staging,
        }
    }

    pub fn base_url(self) -> &'static str {
        match self {
            SourceEnvironment::Staging => "https://dev.brolexy.com",
            SourceEnvironment::Production => "https://brolexy.com",
        }
    }
}

#[derive(Clone)]
pub struct SyncConfig {
    pub bro_public_key: String,
    pub bro_secret_key: String,
    pub source_env: SourceEnvironment,
    pub source_base_url: String,
    pub shopify_store: String,
    pub shopify_token: String,
    pub shopify_api_version: String,
    pub target_base_url: String,
    pub sku_prefix: String,
    pub http_timeout: Duration,
    pub dry_run: bool,
}

impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("bro_public_key", &env::redact_value(BRO_PUBLIC_KEY, &self.bro_public_key))
            .field("bro_secret_key", &"***")
            .field("source_env", &self.source_env)
            .field("source_base_url", &self.source_base_url)
            .field("shopify_store", &self.shopify_store)
            .field("shopify_token", &"***")
            .field("shopify_api_version", &self.shopify_api_version)
            .field("target_base_url", &self.target_base_url)
            .field("sku_prefix", &self.sku_prefix)
            .field("http_timeout", &self.http_timeout)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl SyncConfig {
    /// Load from process environment (after `.env`).
    pub fn from_env() -> Result<Self> {
        env::init_env();
        Self::from_lookup(process_lookup)
    }

    /// Build from any key lookup. Every required key is checked before
    /// returning, so one error names all of the missing ones.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut missing = Vec::new();
        let mut required = |key: &str| {
            get(key).unwrap_or_else(|| {
                missing.push(key.to_string());
                String::new()
            })
        };
        let bro_public_key = required(BRO_PUBLIC_KEY);
        let bro_secret_key = required(BRO_SECRET_KEY);
        let shopify_store = required(SHOPIFY_STORE);
        let shopify_token = required(SHOPIFY_TOKEN);

        let source_env = SourceEnvironment::parse(get(BRO_ENV).as_deref());
        let source_base_url = match get(BRO_BASE_URL) {
            Some(raw) => checked_url(BRO_BASE_URL, &raw, &mut missing),
            None => source_env.base_url().to_string(),
        };

        let store_host = shopify_store
            .trim_end_matches(".myshopify.com")
            .to_string();
        let target_base_url = match get(SHOPIFY_BASE_URL) {
            Some(raw) => checked_url(SHOPIFY_BASE_URL, &raw, &mut missing),
            None => format!("https://{store_host}.myshopify.com"),
        };

        let http_timeout = match get(HTTP_TIMEOUT_SECS) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    missing.push(format!("{HTTP_TIMEOUT_SECS} (expected positive integer)"));
                    Duration::from_secs(DEFAULT_TIMEOUT_SECS)
                }
            },
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        if !missing.is_empty() {
            return Err(SyncError::Config { missing });
        }

        Ok(Self {
            bro_public_key,
            bro_secret_key,
            source_env,
            source_base_url,
            shopify_store: store_host,
            shopify_token,
            shopify_api_version: get(SHOPIFY_API_VERSION)
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            target_base_url,
            // unset falls back to the default; set but blank means no prefix
            sku_prefix: lookup(SKU_PREFIX)
                .map(|v| v.trim().to_string())
                .unwrap_or_else(|| DEFAULT_SKU_PREFIX.to_string()),
            http_timeout,
            dry_run: get(SYNC_DRY_RUN)
                .map(|v| env::parse_flag(&v))
                .unwrap_or(false),
        })
    }
}

/// Process-environment lookup. Empty values read as unset, except `SKU_PREFIX`
/// where an empty value is meaningful.
pub fn process_lookup(key: &str) -> Option<String> {
    if key == SKU_PREFIX {
        env::init_env();
        return std::env::var(key).ok();
    }
    env::env_opt(key)
}

/// Everything `SyncConfig::from_lookup` rejects for this lookup; empty when it loads.
pub fn problems<F>(lookup: F) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    match SyncConfig::from_lookup(lookup) {
        Ok(_) => Vec::new(),
        Err(SyncError::Config { missing }) => missing,
        Err(e) => vec![e.to_string()],
    }
}

/// `problems` against the process environment, as `SyncConfig::from_env` reads it.
pub fn check_env() -> Vec<String> {
    env::init_env();
    problems(process_lookup)
}

fn checked_url(key: &str, raw: &str, problems: &mut Vec<String>) -> String {
    match url::Url::parse(raw) {
        Ok(u) if matches!(u.scheme(), "http" | "https") => raw.trim_end_matches('/').to_string(),
        _ => {
            problems.push(format!("{key} (invalid url)"));
            String::new()
        }
    }
}
