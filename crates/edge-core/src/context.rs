//! Intercepted request model.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use http::{HeaderMap, Method};
use serde::{Deserialize, Serialize};
use url::Url;

/// Unique request identifier for tracing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(pub String);

impl RequestId {
    /// Generate a new request ID.
    pub fn generate() -> Self {
        static SEQUENCE: AtomicU64 = AtomicU64::new(0);

        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self(format!("{:x}-{:x}", nanos, seq))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the request was issued by the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Top-level or frame navigation.
    Navigate,
    /// Same-origin only fetch.
    SameOrigin,
    /// Opaque cross-origin fetch (e.g. `<img>` without CORS).
    NoCors,
    /// CORS fetch.
    #[default]
    Cors,
}

impl fmt::Display for RequestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Navigate => write!(f, "navigate"),
            Self::SameOrigin => write!(f, "same-origin"),
            Self::NoCors => write!(f, "no-cors"),
            Self::Cors => write!(f, "cors"),
        }
    }
}

impl FromStr for RequestMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "navigate" => Ok(Self::Navigate),
            "same-origin" => Ok(Self::SameOrigin),
            "no-cors" => Ok(Self::NoCors),
            "cors" => Ok(Self::Cors),
            other => Err(format!("unknown request mode: {}", other)),
        }
    }
}

/// Declared resource type of the request target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Document,
    Image,
    Script,
    Style,
    Font,
    Manifest,
    /// No declared type (plain `fetch()`).
    #[default]
    Empty,
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document => write!(f, "document"),
            Self::Image => write!(f, "image"),
            Self::Script => write!(f, "script"),
            Self::Style => write!(f, "style"),
            Self::Font => write!(f, "font"),
            Self::Manifest => write!(f, "manifest"),
            Self::Empty => write!(f, "empty"),
        }
    }
}

impl FromStr for Destination {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "document" => Ok(Self::Document),
            "image" => Ok(Self::Image),
            "script" => Ok(Self::Script),
            "style" => Ok(Self::Style),
            "font" => Ok(Self::Font),
            "manifest" => Ok(Self::Manifest),
            "" | "empty" => Ok(Self::Empty),
            other => Err(format!("unknown destination: {}", other)),
        }
    }
}

/// An outgoing request as seen by the interception layer.
#[derive(Debug, Clone)]
pub struct Request {
    /// Unique request identifier.
    pub id: RequestId,
    /// HTTP method.
    pub method: Method,
    /// Absolute request URL.
    pub url: Url,
    /// Request mode.
    pub mode: RequestMode,
    /// Declared resource type.
    pub destination: Destination,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request body (empty for GET).
    pub body: Bytes,
}

impl Request {
    /// Create a new request.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            id: RequestId::generate(),
            method,
            url,
            mode: RequestMode::default(),
            destination: Destination::default(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Create a GET request.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Create a top-level navigation request.
    pub fn navigate(url: Url) -> Self {
        Self::get(url)
            .with_mode(RequestMode::Navigate)
            .with_destination(Destination::Document)
    }

    /// Parse an absolute URL into a request.
    pub fn parse(method: Method, url: &str) -> Result<Self, url::ParseError> {
        Ok(Self::new(method, Url::parse(url)?))
    }

    /// Set the request mode.
    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the declared destination.
    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Whether this is a GET request.
    pub fn is_get(&self) -> bool {
        self.method == Method::GET
    }

    /// URL path component.
    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Whether the request targets the given origin.
    pub fn is_same_origin(&self, origin: &Url) -> bool {
        self.url.origin() == origin.origin()
    }
}
