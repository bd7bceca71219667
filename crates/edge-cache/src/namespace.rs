//! Handle bound to one named namespace.

use std::fmt;
use std::sync::Arc;

use edge_core::Response;

use crate::key::RequestKey;
use crate::storage::{CacheResult, CacheStorage, CachedEntry};

/// A named partition of the cache store.
///
/// Enforces the store-level rule that only HTTP 200 responses are written.
#[derive(Clone)]
pub struct Namespace {
    name: String,
    storage: Arc<dyn CacheStorage>,
}

impl Namespace {
    /// Open (or create) the namespace.
    pub async fn open(storage: Arc<dyn CacheStorage>, name: impl Into<String>) -> CacheResult<Self> {
        let name = name.into();
        storage.open(&name).await?;
        Ok(Self { name, storage })
    }

    /// Bind a handle without creating the namespace; it appears on first write.
    pub fn lazy(storage: Arc<dyn CacheStorage>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            storage,
        }
    }

    /// Namespace name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a stored response by key.
    pub async fn lookup(&self, key: &RequestKey) -> CacheResult<Option<Response>> {
        Ok(self
            .storage
            .lookup(&self.name, key)
            .await?
            .map(|entry| entry.response))
    }

    /// Store a response. Returns `false` without writing if it is not a 200.
    pub async fn put(&self, key: RequestKey, response: Response) -> CacheResult<bool> {
        if !response.is_ok() {
            return Ok(false);
        }
        self.storage
            .store(&self.name, key, CachedEntry::new(response))
            .await?;
        Ok(true)
    }

    /// All keys currently stored.
    pub async fn keys(&self) -> CacheResult<Vec<RequestKey>> {
        self.storage.keys(&self.name).await
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace").field("name", &self.name).finish()
    }
}
