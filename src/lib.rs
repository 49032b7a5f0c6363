//! Brolexy -> Shopify catalog sync.
//!
//! Pulls the Brolexy product catalog (HMAC-signed requests) and upserts every
//! product into a Shopify store, correlating records through a derived SKU.
pub mod config;
pub mod error;
pub mod logging;
pub mod providers;
pub mod sync;

pub mod util {
    pub mod env;
}

pub use config::SyncConfig;
pub use error::{Service, SyncError};
pub use sync::{run_pass, SyncOptions, SyncReport};
