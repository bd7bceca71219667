//! Namespace retention policies.

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

/// How many entries a namespace may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "capacity", rename_all = "lowercase")]
pub enum NamespacePolicy {
    /// No limit; the namespace is replaced wholesale instead.
    #[default]
    Unbounded,
    /// Evict the least recently used entry once the cap is reached.
    Lru(NonZeroUsize),
}

impl NamespacePolicy {
    /// Build from a configured capacity, where `0` means unbounded.
    pub fn from_capacity(capacity: usize) -> Self {
        NonZeroUsize::new(capacity).map_or(Self::Unbounded, Self::Lru)
    }

    /// Entry cap, if any.
    pub fn capacity(&self) -> Option<usize> {
        match self {
            Self::Unbounded => None,
            Self::Lru(cap) => Some(cap.get()),
        }
    }
}
