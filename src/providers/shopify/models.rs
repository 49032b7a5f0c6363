//! Shopify Admin REST product shapes used by the sync.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::providers::brolexy::SourceProduct;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetVariant {
    pub id: i64,
    /// Shopify returns prices as strings ("9.99"); numbers are accepted too.
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub inventory_quantity: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetProduct {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body_html: Option<String>,
    #[serde(default)]
    pub variants: Vec<TargetVariant>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductsPage {
    #[serde(default)]
    pub products: Vec<TargetProduct>,
}

/// An existing Shopify variant that carries a derived SKU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExistingMatch {
    pub product_id: i64,
    pub variant_id: i64,
}

/// Linear scan for the first variant whose SKU equals `sku`.
pub fn find_variant_by_sku(products: &[TargetProduct], sku: &str) -> Option<ExistingMatch> {
    products.iter().find_map(|p| {
        p.variants
            .iter()
            .find(|v| v.sku.as_deref() == Some(sku))
            .map(|v| ExistingMatch {
                product_id: p.id,
                variant_id: v.id,
            })
    })
}

/// Request body wrapper: `{ "product": { ... } }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductEnvelope {
    pub product: ProductPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub title: String,
    pub body_html: String,
    pub variants: Vec<VariantPayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory_quantity: Option<i64>,
}

/// Description block shown on the product page.
pub fn description_html(category: Option<&str>, region: Option<&str>) -> String {
    format!(
        "<strong>Category:</strong> {}<br><strong>Region:</strong> {}",
        escape_html(category.unwrap_or_default()),
        escape_html(region.unwrap_or_default())
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// New product with a single variant carrying the derived SKU.
pub fn build_create_payload(product: &SourceProduct, sku: &str) -> ProductEnvelope {
    ProductEnvelope {
        product: ProductPayload {
            id: None,
            title: product.name.clone(),
            body_html: description_html(product.category.as_deref(), product.region.as_deref()),
            variants: vec![VariantPayload {
                id: None,
                price: product.price,
                sku: Some(sku.to_string()),
                inventory_quantity: product.in_stock,
            }],
        },
    }
}

/// Update of an existing product, addressing the matched variant by id.
pub fn build_update_payload(product: &SourceProduct, existing: &ExistingMatch) -> ProductEnvelope {
    ProductEnvelope {
        product: ProductPayload {
            id: Some(existing.product_id),
            title: product.name.clone(),
            body_html: description_html(product.category.as_deref(), product.region.as_deref()),
            variants: vec![VariantPayload {
                id: Some(existing.variant_id),
                price: product.price,
                sku: None,
                inventory_quantity: product.in_stock,
            }],
        },
    }
}
