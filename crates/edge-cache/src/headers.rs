//! Cache debugging headers.

use std::fmt;

use edge_core::Response;
use http::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

/// Header names for cache debugging.
pub mod header_names {
    /// Cache status header (HIT, MISS, FALLBACK, BYPASS, SYNTHETIC).
    pub const X_CACHE_STATUS: &str = "x-cache-status";
    /// Namespace the response was read from or written to.
    pub const X_CACHE_NAMESPACE: &str = "x-cache-namespace";
}

/// How an intercepted response relates to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// Served from the cache as the primary source.
    Hit,
    /// Not cached; served from the network.
    Miss,
    /// Network failed; served from the cache instead.
    Fallback,
    /// Served from the network without consulting the cache.
    Bypass,
    /// Generated locally (e.g. placeholder for an unreachable image).
    Synthetic,
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hit => write!(f, "HIT"),
            Self::Miss => write!(f, "MISS"),
            Self::Fallback => write!(f, "FALLBACK"),
            Self::Bypass => write!(f, "BYPASS"),
            Self::Synthetic => write!(f, "SYNTHETIC"),
        }
    }
}

/// Cache explain headers for debugging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheExplainHeaders {
    /// Overall cache status.
    pub status: CacheStatus,
    /// Namespace involved, if any.
    pub namespace: Option<String>,
}

impl CacheExplainHeaders {
    /// Create explain headers for a status.
    pub fn new(status: CacheStatus) -> Self {
        Self {
            status,
            namespace: None,
        }
    }

    /// Set the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Convert to HTTP headers.
    pub fn to_headers(&self) -> Vec<(HeaderName, HeaderValue)> {
        let mut headers = vec![(
            HeaderName::from_static(header_names::X_CACHE_STATUS),
            HeaderValue::from_str(&self.status.to_string())
                .unwrap_or_else(|_| HeaderValue::from_static("UNKNOWN")),
        )];

        if let Some(value) = self
            .namespace
            .as_deref()
            .and_then(|ns| HeaderValue::from_str(ns).ok())
        {
            headers.push((HeaderName::from_static(header_names::X_CACHE_NAMESPACE), value));
        }

        headers
    }

    /// Attach the headers to a response.
    pub fn apply(&self, response: &mut Response) {
        for (name, value) in self.to_headers() {
            response.headers_mut().insert(name, value);
        }
    }
}
