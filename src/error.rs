use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Which remote a failure came from; used in error messages and log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Brolexy,
    Shopify,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Service::Brolexy => f.write_str("brolexy"),
            Service::Shopify => f.write_str("shopify"),
        }
    }
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("missing or invalid configuration: {}", .missing.join(", "))]
    Config { missing: Vec<String> },

    #[error("{service} http {status}: {body}")]
    Remote {
        service: Service,
        status: u16,
        /// Response body as JSON, or `Null` when the body was empty or not JSON.
        body: Value,
    },

    #[error("{service} network: {source}")]
    Transport {
        service: Service,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} json: {source}")]
    Decode {
        service: Service,
        #[source]
        source: serde_json::Error,
    },

    #[error("source fetch failed: {0}")]
    Fetch(#[source] Box<SyncError>),

    #[error("target lookup failed: {0}")]
    Lookup(#[source] Box<SyncError>),
}

impl SyncError {
    pub fn transport(service: Service, source: reqwest::Error) -> Self {
        SyncError::Transport { service, source }
    }

    /// True when the request hit the client timeout (directly or wrapped by a stage).
    pub fn is_timeout(&self) -> bool {
        match self {
            SyncError::Transport { source, .. } => source.is_timeout(),
            SyncError::Fetch(inner) | SyncError::Lookup(inner) => inner.is_timeout(),
            _ => false,
        }
    }

    /// HTTP status of a remote rejection, looking through stage wrappers.
    pub fn status(&self) -> Option<u16> {
        match self {
            SyncError::Remote { status, .. } => Some(*status),
            SyncError::Fetch(inner) | SyncError::Lookup(inner) => inner.status(),
            _ => None,
        }
    }
}

pub type Result<T, E = SyncError> = std::result::Result<T, E>;
