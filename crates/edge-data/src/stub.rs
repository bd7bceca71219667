//! Scripted in-process network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use edge_core::{Request, Response};
use http::StatusCode;

use crate::client::{FetchError, Network};

#[derive(Debug, Clone)]
enum Reply {
    Respond(Response),
    Fail(FetchError),
}

/// A network that answers from a route table and records every call.
///
/// Unknown URLs answer 404. While offline every fetch fails with a
/// connection error.
#[derive(Debug, Default)]
pub struct StubNetwork {
    routes: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<String>>,
    offline: AtomicBool,
}

impl StubNetwork {
    /// Create an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with `response`.
    pub fn with_route(self, url: &str, response: Response) -> Self {
        self.set_route(url, response);
        self
    }

    /// Answer `url` with `response`, replacing any previous route.
    pub fn set_route(&self, url: &str, response: Response) {
        if let Ok(mut routes) = self.routes.lock() {
            routes.insert(url.to_string(), Reply::Respond(response));
        }
    }

    /// Fail every fetch of `url` with a connection error.
    pub fn set_failure(&self, url: &str) {
        if let Ok(mut routes) = self.routes.lock() {
            routes.insert(
                url.to_string(),
                Reply::Fail(FetchError::Connection(format!("unreachable: {}", url))),
            );
        }
    }

    /// Switch the whole network on or off.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// URLs fetched so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// How many times `url` was fetched.
    pub fn call_count(&self, url: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == url).count()
    }

    /// Forget recorded calls.
    pub fn reset_calls(&self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.clear();
        }
    }
}

#[async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        let url = request.url.to_string();
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(url.clone());
        }

        if self.offline.load(Ordering::SeqCst) {
            return Err(FetchError::Connection("network offline".to_string()));
        }

        let reply = self
            .routes
            .lock()
            .map_err(|_| FetchError::Request("route table lock poisoned".to_string()))?
            .get(&url)
            .cloned();

        match reply {
            Some(Reply::Respond(response)) => Ok(response),
            Some(Reply::Fail(err)) => Err(err),
            None => Ok(Response::new(StatusCode::NOT_FOUND)),
        }
    }
}
