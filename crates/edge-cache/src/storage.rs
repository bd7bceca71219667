//! Storage capability and the in-process backend.

use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use edge_core::Response;
use lru::LruCache;

use crate::key::RequestKey;
use crate::policy::NamespacePolicy;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache operation errors.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Backend storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// The backend refused the write.
    #[error("quota exceeded in namespace {0}")]
    QuotaExceeded(String),
}

/// A stored response.
#[derive(Debug, Clone)]
pub struct CachedEntry {
    /// The stored response.
    pub response: Response,
    /// When the entry was written.
    pub stored_at: DateTime<Utc>,
}

impl CachedEntry {
    /// Wrap a response, stamping the current time.
    pub fn new(response: Response) -> Self {
        Self {
            response,
            stored_at: Utc::now(),
        }
    }
}

/// Named-namespace response storage.
///
/// Every method is a single atomic step: one key lookup, one key write, or
/// one namespace-level enumerate/delete. Concurrent handlers need no further
/// coordination because no invariant spans two keys.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a namespace, creating it if absent.
    async fn open(&self, namespace: &str) -> CacheResult<()>;

    /// Whether a namespace exists.
    async fn has(&self, namespace: &str) -> CacheResult<bool>;

    /// Look up an entry. A missing namespace is a miss.
    async fn lookup(&self, namespace: &str, key: &RequestKey) -> CacheResult<Option<CachedEntry>>;

    /// Write an entry, creating the namespace if absent. Overwrites by key.
    async fn store(&self, namespace: &str, key: RequestKey, entry: CachedEntry) -> CacheResult<()>;

    /// All keys in a namespace. A missing namespace has none.
    async fn keys(&self, namespace: &str) -> CacheResult<Vec<RequestKey>>;

    /// Names of all existing namespaces.
    async fn namespaces(&self) -> CacheResult<Vec<String>>;

    /// Delete a namespace and all its entries. Returns whether it existed.
    async fn delete_namespace(&self, namespace: &str) -> CacheResult<bool>;

    /// Set the retention policy for a namespace name. Applies to the
    /// existing namespace at once, shrinking it if needed, and to any
    /// namespace later created under that name.
    async fn set_policy(&self, namespace: &str, policy: NamespacePolicy) -> CacheResult<()>;
}

/// In-process storage backend.
///
/// Namespaces given a policy with [`with_policy`](Self::with_policy) or
/// [`CacheStorage::set_policy`] are LRU-capped; all others are unbounded.
#[derive(Default)]
pub struct MemoryCacheStorage {
    table: Mutex<Table>,
}

type Partition = LruCache<RequestKey, CachedEntry>;

#[derive(Default)]
struct Table {
    partitions: BTreeMap<String, Partition>,
    policies: HashMap<String, NamespacePolicy>,
}

impl Table {
    fn policy(&self, namespace: &str) -> NamespacePolicy {
        self.policies.get(namespace).copied().unwrap_or_default()
    }

    fn partition(&mut self, namespace: &str) -> &mut Partition {
        let policy = self.policy(namespace);
        self.partitions
            .entry(namespace.to_string())
            .or_insert_with(|| match policy {
                NamespacePolicy::Unbounded => LruCache::unbounded(),
                NamespacePolicy::Lru(cap) => LruCache::new(cap),
            })
    }
}

impl MemoryCacheStorage {
    /// Create an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the retention policy for a namespace name.
    pub fn with_policy(mut self, namespace: impl Into<String>, policy: NamespacePolicy) -> Self {
        self.table
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .policies
            .insert(namespace.into(), policy);
        self
    }

    /// Retention policy applied to a namespace.
    pub fn policy(&self, namespace: &str) -> CacheResult<NamespacePolicy> {
        Ok(self.lock()?.policy(namespace))
    }

    fn lock(&self) -> CacheResult<MutexGuard<'_, Table>> {
        self.table
            .lock()
            .map_err(|_| CacheError::Storage("namespace table lock poisoned".to_string()))
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, namespace: &str) -> CacheResult<()> {
        self.lock()?.partition(namespace);
        Ok(())
    }

    async fn has(&self, namespace: &str) -> CacheResult<bool> {
        Ok(self.lock()?.partitions.contains_key(namespace))
    }

    async fn lookup(&self, namespace: &str, key: &RequestKey) -> CacheResult<Option<CachedEntry>> {
        let mut table = self.lock()?;
        Ok(table
            .partitions
            .get_mut(namespace)
            .and_then(|partition| partition.get(key))
            .cloned())
    }

    async fn store(&self, namespace: &str, key: RequestKey, entry: CachedEntry) -> CacheResult<()> {
        self.lock()?.partition(namespace).put(key, entry);
        Ok(())
    }

    async fn keys(&self, namespace: &str) -> CacheResult<Vec<RequestKey>> {
        let table = self.lock()?;
        Ok(table
            .partitions
            .get(namespace)
            .map(|partition| partition.iter().map(|(k, _)| k.clone()).collect())
            .unwrap_or_default())
    }

    async fn namespaces(&self) -> CacheResult<Vec<String>> {
        Ok(self.lock()?.partitions.keys().cloned().collect())
    }

    async fn delete_namespace(&self, namespace: &str) -> CacheResult<bool> {
        Ok(self.lock()?.partitions.remove(namespace).is_some())
    }

    async fn set_policy(&self, namespace: &str, policy: NamespacePolicy) -> CacheResult<()> {
        let mut table = self.lock()?;
        table.policies.insert(namespace.to_string(), policy);
        if let Some(partition) = table.partitions.get_mut(namespace) {
            partition.resize(match policy {
                NamespacePolicy::Unbounded => NonZeroUsize::MAX,
                NamespacePolicy::Lru(cap) => cap,
            });
        }
        Ok(())
    }
}
