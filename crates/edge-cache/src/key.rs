//! Request identity used as the cache key.

use std::fmt;

use edge_core::Request;
use http::Method;
use url::Url;

/// A cache key uniquely identifying a stored response: (method, absolute URL).
///
/// Only GET requests produce a key, so nothing else can ever be stored.
/// The URL fragment never reaches the network and is not part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    method: Method,
    url: String,
}

impl RequestKey {
    /// Key for a GET of the given URL.
    pub fn get(url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self {
            method: Method::GET,
            url: url.into(),
        }
    }

    /// Key for an intercepted request, `None` unless it is a GET.
    pub fn from_request(request: &Request) -> Option<Self> {
        request.is_get().then(|| Self::get(&request.url))
    }

    /// The request method (always GET).
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The absolute URL string.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}
