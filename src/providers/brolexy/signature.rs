//! Brolexy request signing.
//!
//! Every request carries `time` (Unix seconds as a decimal string) and
//! `signature` = base64(HMAC-SHA256(secret, time)).
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::BRO_SECRET_KEY;
use crate::error::{Result, SyncError};

type HmacSha256 = Hmac<Sha256>;

/// Sign a timestamp with the shared secret.
///
/// An empty secret is a configuration error and is rejected before any request is built.
pub fn generate_signature(secret: &str, timestamp: i64) -> Result<String> {
    if secret.is_empty() {
        return Err(SyncError::Config {
            missing: vec![BRO_SECRET_KEY.to_string()],
        });
    }
    // HMAC accepts keys of any length
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SyncError::Config {
        missing: vec![BRO_SECRET_KEY.to_string()],
    })?;
    mac.update(timestamp.to_string().as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Timestamp + signature pair for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTime {
    pub time: i64,
    pub signature: String,
}

impl SignedTime {
    pub fn now(secret: &str) -> Result<Self> {
        Self::at(secret, chrono::Utc::now().timestamp())
    }

    pub fn at(secret: &str, time: i64) -> Result<Self> {
        Ok(Self {
            time,
            signature: generate_signature(secret, time)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector() {
        assert_eq!(
            generate_signature("test-secret", 1_700_000_000).unwrap(),
            "G3Tq+H2kaHe6ZRrIErJKO/AZkOntAQG4gmj2D5ZXKeI="
        );
    }

    #[test]
    fn deterministic_for_same_input() {
        let a = generate_signature("k", 1_234_567_890).unwrap();
        let b = generate_signature("k", 1_234_567_890).unwrap();
        assert_eq!(a, b);
        // 32-byte digest -> 44 base64 chars with padding
        assert_eq!(a.len(), 44);
    }

    #[test]
    fn differs_across_timestamps() {
        let sigs: Vec<String> = (1_700_000_000..1_700_000_050)
            .map(|t| generate_signature("test-secret", t).unwrap())
            .collect();
        for (i, a) in sigs.iter().enumerate() {
            for b in &sigs[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(sigs[1], "/tCwUbL9ajFOeyxdaXZVrXUyGxEZwIXaKZqucFmvgXI=");
    }

    #[test]
    fn empty_secret_is_config_error() {
        let err = generate_signature("", 1).unwrap_err();
        assert!(matches!(err, SyncError::Config { .. }));
    }

    #[test]
    fn signed_time_now_is_recent() {
        let before = chrono::Utc::now().timestamp();
        let st = SignedTime::now("k").unwrap();
        assert!(st.time >= before);
        assert_eq!(st.signature, generate_signature("k", st.time).unwrap());
    }
}
