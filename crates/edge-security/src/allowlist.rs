//! Trusted external host allow-list.

use serde::{Deserialize, Serialize};
use url::Url;

/// Allow-list of external hosts whose content is treated like first-party.
///
/// Entries are either exact hosts (`images.unsplash.com`) or wildcard
/// patterns (`*.cloudinary.com`). Matching is case-insensitive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrustedHosts {
    /// Allowed exact hosts.
    hosts: Vec<String>,
    /// Allowed host patterns (supports * wildcard).
    patterns: Vec<String>,
}

impl TrustedHosts {
    /// Create an empty allow-list (nothing trusted).
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from config entries, routing `*` entries to patterns.
    pub fn from_entries<S: AsRef<str>>(entries: &[S]) -> Self {
        entries.iter().fold(Self::new(), |list, entry| {
            let entry = entry.as_ref().trim();
            if entry.is_empty() {
                list
            } else if entry.contains('*') {
                list.allow_pattern(entry)
            } else {
                list.allow_host(entry)
            }
        })
    }

    /// Allow a specific host.
    pub fn allow_host(mut self, host: impl Into<String>) -> Self {
        self.hosts.push(host.into().to_lowercase());
        self
    }

    /// Allow a host pattern (supports * as wildcard).
    ///
    /// Examples:
    /// - `*.example.com` - matches `cdn.example.com`, `a.b.example.com`
    /// - `img.*.example.com` - matches `img.eu.example.com`
    pub fn allow_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into().to_lowercase());
        self
    }

    /// Check if a host is trusted.
    pub fn is_trusted_host(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_lowercase();

        self.hosts.iter().any(|h| *h == host)
            || self.patterns.iter().any(|p| matches_pattern(&host, p))
    }

    /// Check if a URL's host is trusted.
    pub fn is_trusted_url(&self, url: &Url) -> bool {
        url.host_str().is_some_and(|host| self.is_trusted_host(host))
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty() && self.patterns.is_empty()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.hosts.len() + self.patterns.len()
    }
}

fn matches_pattern(host: &str, pattern: &str) -> bool {
    if !pattern.contains('*') {
        return host == pattern;
    }

    let parts: Vec<&str> = pattern.split('*').collect();

    if parts.len() == 2 {
        let prefix = parts[0];
        let suffix = parts[1];

        // "*.example.com" must not match the bare apex "example.com".
        host.len() > prefix.len() + suffix.len()
            && host.starts_with(prefix)
            && host.ends_with(suffix)
    } else {
        // Multiple wildcards: literal segments must appear in order.
        let last = parts.len() - 1;
        let mut rest = host;
        for (i, part) in parts.iter().enumerate() {
            if i == 0 {
                match rest.strip_prefix(part) {
                    Some(r) => rest = r,
                    None => return false,
                }
            } else if i == last {
                return rest.ends_with(part);
            } else if let Some(idx) = rest.find(part) {
                rest = &rest[idx + part.len()..];
            } else {
                return false;
            }
        }
        true
    }
}

/// Pre-configured allow-lists for common media hosts.
pub mod presets {
    use super::TrustedHosts;

    /// Common stock-photo and image-CDN hosts.
    pub fn media_hosts() -> TrustedHosts {
        TrustedHosts::new()
            .allow_host("images.unsplash.com")
            .allow_host("images.pexels.com")
            .allow_pattern("*.cloudinary.com")
            .allow_pattern("*.imgix.net")
            .allow_pattern("*.googleusercontent.com")
    }
}
