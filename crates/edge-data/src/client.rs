//! Network capability and the HTTP client implementation.

use async_trait::async_trait;
use edge_core::{Request, Response};

/// Error type for fetch operations.
///
/// Only transport failures are errors. A response with any status,
/// including 4xx/5xx, is a successful fetch.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Body error: {0}")]
    Body(String),

    #[error("Request error: {0}")]
    Request(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else if err.is_body() || err.is_decode() {
            Self::Body(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

/// The network as seen from the interception layer.
#[async_trait]
pub trait Network: Send + Sync {
    /// Send a request and read the full response.
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError>;
}

/// `reqwest`-backed network.
#[derive(Debug, Clone, Default)]
pub struct HttpNetwork {
    client: reqwest::Client,
}

impl HttpNetwork {
    /// Create a network with a default client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());

        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.bytes().await?;

        tracing::trace!(url = %request.url, status = status.as_u16(), bytes = body.len(), "network response");

        Ok(Response::new(status).with_headers(headers).with_body(body))
    }
}
