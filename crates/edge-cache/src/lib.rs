//! Namespaced response store for the edge request-interception engine.
//!
//! This crate provides:
//! - `CacheStorage` - Storage capability (open, lookup, store, enumerate, delete)
//! - `MemoryCacheStorage` - In-process backend with per-namespace LRU caps
//! - `Namespace` - Handle bound to one named partition
//! - `RequestKey` - (method, URL) request identity
//! - `CacheExplainHeaders` - Debug headers for cache behavior
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use edge_cache::{MemoryCacheStorage, Namespace, NamespacePolicy, RequestKey};
//!
//! let storage = Arc::new(
//!     MemoryCacheStorage::new().with_policy("images", NamespacePolicy::from_capacity(500)),
//! );
//! let images = Namespace::open(storage, "images").await?;
//! images.put(RequestKey::get(&url), response).await?;
//! ```

mod headers;
mod key;
mod namespace;
mod policy;
mod storage;

pub use headers::*;
pub use key::*;
pub use namespace::*;
pub use policy::*;
pub use storage::*;
