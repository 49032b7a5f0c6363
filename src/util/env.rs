//! Environment helpers: centralized dotenv loading and ergonomic getters.
//! Call `init_env()` once early in each binary (or rely on lazy Once).
use std::sync::Once;
use tracing::{info, warn};

static INIT: Once = Once::new();

/// Load .env exactly once. Safe to call many times.
pub fn init_env() {
    INIT.call_once(|| {
        if dotenv::dotenv().is_err() {
            // Fallback to Cargo project root
            let candidate = format!("{}/.env", env!("CARGO_MANIFEST_DIR"));
            let _ = dotenv::from_filename(candidate);
        }
    });
}

/// Get optional env var (None if unset or empty).
pub fn env_opt(key: &str) -> Option<String> {
    init_env();
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Accepts 1/true/on/yes (case-insensitive) as true.
pub(crate) fn parse_flag(raw: &str) -> bool {
    let v = raw.trim().to_ascii_lowercase();
    matches!(v.as_str(), "1" | "true" | "on" | "yes")
}

/// Mask values whose key looks like a credential.
pub fn redact_value(key: &str, val: &str) -> String {
    let k = key.to_ascii_uppercase();
    if k.contains("PASSWORD") || k.contains("SECRET") || k.contains("KEY") || k.contains("TOKEN")
    {
        return if val.trim().is_empty() {
            String::new()
        } else {
            "***".to_string()
        };
    }
    val.trim().to_string()
}

/// Log a consolidated, redacted snapshot of the given keys.
/// Returns the list of keys from `required` that are unset or empty.
pub fn preflight_snapshot(title: &str, required: &[&str], also_log: &[&str]) -> Vec<String> {
    init_env();
    let missing: Vec<String> = required
        .iter()
        .filter(|k| env_opt(k).is_none())
        .map(|k| k.to_string())
        .collect();
    let snapshot: Vec<(String, String)> = required
        .iter()
        .chain(also_log.iter())
        .map(|&k| {
            let v = env_opt(k).unwrap_or_default();
            (k.to_string(), redact_value(k, &v))
        })
        .collect();
    info!(target = "preflight", title, snapshot = ?snapshot, "configuration snapshot");
    if !missing.is_empty() {
        warn!(target = "preflight", title, missing = ?missing, "required configuration missing");
    }
    missing
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_credentials_only() {
        assert_eq!(redact_value("BRO_SECRET_KEY", "abc"), "***");
        assert_eq!(redact_value("SHOPIFY_TOKEN", "shpat_1"), "***");
        assert_eq!(redact_value("BRO_PUBLIC_KEY", ""), "");
        assert_eq!(redact_value("SHOPIFY_STORE", " my-shop "), "my-shop");
    }

    #[test]
    fn flag_values() {
        assert!(parse_flag("YES"));
        assert!(parse_flag(" 1 "));
        assert!(!parse_flag("off"));
        assert!(!parse_flag(""));
    }
}
