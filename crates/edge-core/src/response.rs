//! Response model shared by the cache and the network layer.

use std::borrow::Cow;
use std::fmt;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};

/// Where the answer to an intercepted request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    /// Fresh from the network.
    Network,
    /// From the cache as the primary source.
    Cache,
    /// From the cache after the network failed.
    Fallback,
    /// Generated locally.
    Synthetic,
    /// Nothing could answer; the network error is returned.
    Unavailable,
    /// Not intercepted; forwarded to the network untouched.
    Passthrough,
}

impl ResponseSource {
    /// Every source, in a fixed order.
    pub const ALL: [ResponseSource; 6] = [
        Self::Network,
        Self::Cache,
        Self::Fallback,
        Self::Synthetic,
        Self::Unavailable,
        Self::Passthrough,
    ];
}

impl fmt::Display for ResponseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::Cache => write!(f, "cache"),
            Self::Fallback => write!(f, "fallback"),
            Self::Synthetic => write!(f, "synthetic"),
            Self::Unavailable => write!(f, "unavailable"),
            Self::Passthrough => write!(f, "passthrough"),
        }
    }
}

/// A complete HTTP response.
///
/// The body is held as [`Bytes`], so a response can be duplicated without
/// copying the payload; each copy is independently readable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    /// Create an empty response with the given status.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Create a 200 response with a body.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK).with_body(body)
    }

    /// Synthetic "not found" used when an image cannot be fetched at all.
    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND)
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Add a header.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Replace all headers.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Response status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable response headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Response body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body decoded as UTF-8 (lossy).
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Whether the status is exactly 200, the only status eligible for storage.
    pub fn is_ok(&self) -> bool {
        self.status == StatusCode::OK
    }

    /// Split into two independent copies: one for the cache, one for the caller.
    pub fn tee(self) -> (Self, Self) {
        let copy = self.clone();
        (self, copy)
    }
}
