//! The per-classification strategy table.

use std::fmt;

use serde::Serialize;

use crate::classify::Classification;

/// Which namespace a strategy reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NamespaceKind {
    /// The versioned application namespace.
    App,
    /// The stable image namespace.
    Image,
}

/// What to do when the primary source cannot answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackStrategy {
    /// Answer with a locally generated 404.
    SyntheticNotFound,
    /// Exact URL from the cache, else the cached root document.
    CachedUrlOrRoot,
    /// Exact URL from the cache.
    CachedUrl,
    /// Return the network error as-is.
    NetworkError,
    /// Not intercepted; nothing to fall back to.
    None,
}

/// When a network response is copied into the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WriteBack {
    /// Before returning, after a miss and a 200.
    OnMiss,
    /// In the background, after every 200.
    Background,
    /// Never.
    Never,
}

/// The fixed algorithm for a classified request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Image namespace first; the network only on a miss.
    CacheFirstImage,
    /// Network first; cached page or root when offline. Never stored.
    NetworkFirstNavigation,
    /// Network first with a background refresh of the app namespace.
    NetworkFirstRefresh,
    /// App namespace first; stored on a miss.
    CacheFirstStatic,
    /// Forwarded to the network untouched.
    Passthrough,
}

impl Strategy {
    /// Select the strategy for a classification.
    pub fn for_classification(classification: Classification) -> Self {
        match classification {
            Classification::Image { .. } => Self::CacheFirstImage,
            Classification::NavigationDocument => Self::NetworkFirstNavigation,
            Classification::ScriptOrStyle => Self::NetworkFirstRefresh,
            Classification::OtherStatic => Self::CacheFirstStatic,
            Classification::Api | Classification::CrossOriginUntrusted => Self::Passthrough,
        }
    }

    /// Whether the cache is consulted before the network.
    pub fn is_cache_first(&self) -> bool {
        matches!(self, Self::CacheFirstImage | Self::CacheFirstStatic)
    }

    /// Namespace involved, if any.
    pub fn namespace(&self) -> Option<NamespaceKind> {
        match self {
            Self::CacheFirstImage => Some(NamespaceKind::Image),
            Self::NetworkFirstNavigation | Self::NetworkFirstRefresh | Self::CacheFirstStatic => {
                Some(NamespaceKind::App)
            }
            Self::Passthrough => None,
        }
    }

    /// Behavior when the primary source fails.
    pub fn fallback(&self) -> FallbackStrategy {
        match self {
            Self::CacheFirstImage => FallbackStrategy::SyntheticNotFound,
            Self::NetworkFirstNavigation => FallbackStrategy::CachedUrlOrRoot,
            Self::NetworkFirstRefresh => FallbackStrategy::CachedUrl,
            Self::CacheFirstStatic => FallbackStrategy::NetworkError,
            Self::Passthrough => FallbackStrategy::None,
        }
    }

    /// When network responses are stored.
    pub fn write_back(&self) -> WriteBack {
        match self {
            Self::CacheFirstImage | Self::CacheFirstStatic => WriteBack::OnMiss,
            Self::NetworkFirstRefresh => WriteBack::Background,
            Self::NetworkFirstNavigation | Self::Passthrough => WriteBack::Never,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CacheFirstImage => write!(f, "cache-first (images)"),
            Self::NetworkFirstNavigation => write!(f, "network-first (navigation)"),
            Self::NetworkFirstRefresh => write!(f, "network-first with background refresh"),
            Self::CacheFirstStatic => write!(f, "cache-first"),
            Self::Passthrough => write!(f, "passthrough"),
        }
    }
}

impl fmt::Display for FallbackStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SyntheticNotFound => write!(f, "synthetic 404"),
            Self::CachedUrlOrRoot => write!(f, "cached page, then cached root"),
            Self::CachedUrl => write!(f, "cached copy"),
            Self::NetworkError => write!(f, "network error"),
            Self::None => write!(f, "none"),
        }
    }
}

impl fmt::Display for WriteBack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OnMiss => write!(f, "on miss"),
            Self::Background => write!(f, "background"),
            Self::Never => write!(f, "never"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_table() {
        let image = Strategy::for_classification(Classification::Image { trusted: true });
        assert!(image.is_cache_first());
        assert_eq!(image.namespace(), Some(NamespaceKind::Image));
        assert_eq!(image.fallback(), FallbackStrategy::SyntheticNotFound);

        let nav = Strategy::for_classification(Classification::NavigationDocument);
        assert!(!nav.is_cache_first());
        assert_eq!(nav.write_back(), WriteBack::Never);

        let script = Strategy::for_classification(Classification::ScriptOrStyle);
        assert_eq!(script.write_back(), WriteBack::Background);
        assert_eq!(script.fallback(), FallbackStrategy::CachedUrl);

        let other = Strategy::for_classification(Classification::OtherStatic);
        assert_eq!(other.namespace(), Some(NamespaceKind::App));
        assert_eq!(other.fallback(), FallbackStrategy::NetworkError);
    }

    #[test]
    fn test_passthrough_classes() {
        for c in [Classification::Api, Classification::CrossOriginUntrusted] {
            let s = Strategy::for_classification(c);
            assert_eq!(s, Strategy::Passthrough);
            assert_eq!(s.namespace(), None);
            assert_eq!(s.write_back(), WriteBack::Never);
        }
    }

    #[test]
    fn test_untrusted_images_share_image_strategy() {
        assert_eq!(
            Strategy::for_classification(Classification::Image { trusted: false }),
            Strategy::CacheFirstImage
        );
    }
}
