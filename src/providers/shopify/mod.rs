pub mod models;
pub mod provider;

pub use models::{
    build_create_payload, build_update_payload, find_variant_by_sku, ExistingMatch,
    ProductEnvelope, TargetProduct, TargetVariant,
};
pub use provider::ShopifyProvider;
