//! Engine configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Configuration for one deployment of the interception engine.
///
/// The deployment version is an explicit value here rather than a constant
/// baked into the engine; every namespace name derives from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Deployment version, chosen at build time.
    pub version: String,

    /// The application's own origin.
    pub origin: Url,

    /// Prefix for the versioned application namespace.
    #[serde(default = "default_app_prefix")]
    pub app_namespace_prefix: String,

    /// Name of the stable image namespace.
    #[serde(default = "default_image_namespace")]
    pub image_namespace: String,

    /// Path prefix of dynamic API endpoints.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Asset paths stored at install time.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// External hosts whose images are cached like local ones.
    #[serde(default)]
    pub trusted_image_hosts: Vec<String>,

    /// Path fragments that identify media-transform endpoints.
    #[serde(default = "default_image_path_patterns")]
    pub image_path_patterns: Vec<String>,

    /// LRU entry cap for the image namespace (0 = unbounded).
    #[serde(default = "default_image_cache_capacity")]
    pub image_cache_capacity: usize,

    /// Whether images from hosts outside the allow-list are stored.
    #[serde(default)]
    pub cache_untrusted_images: bool,

    /// Activate as soon as install completes.
    #[serde(default = "default_true")]
    pub skip_waiting: bool,

    /// Attach cache debugging headers to intercepted responses.
    #[serde(default)]
    pub explain_headers: bool,

    /// Push notification presentation.
    #[serde(default)]
    pub notification: NotificationConfig,
}

fn default_app_prefix() -> String {
    "app-".to_string()
}

fn default_image_namespace() -> String {
    "images".to_string()
}

fn default_api_prefix() -> String {
    "/api/".to_string()
}

fn default_precache() -> Vec<String> {
    vec!["/".to_string(), "/manifest.json".to_string()]
}

fn default_image_path_patterns() -> Vec<String> {
    vec![
        "/_next/image".to_string(),
        "/image/upload/".to_string(),
        "/cdn-cgi/image/".to_string(),
    ]
}

fn default_image_cache_capacity() -> usize {
    500
}

fn default_true() -> bool {
    true
}

impl EngineConfig {
    /// Create a config with defaults for everything but version and origin.
    pub fn new(version: impl Into<String>, origin: Url) -> Self {
        Self {
            version: version.into(),
            origin,
            app_namespace_prefix: default_app_prefix(),
            image_namespace: default_image_namespace(),
            api_prefix: default_api_prefix(),
            precache: default_precache(),
            trusted_image_hosts: Vec::new(),
            image_path_patterns: default_image_path_patterns(),
            image_cache_capacity: default_image_cache_capacity(),
            cache_untrusted_images: false,
            skip_waiting: true,
            explain_headers: false,
            notification: NotificationConfig::default(),
        }
    }

    /// Load config from a file (`.json` or TOML).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let config: Self = if path.extension().is_some_and(|e| e == "json") {
            serde_json::from_str(&content)?
        } else {
            toml::from_str(&content)?
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants the engine relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version.trim().is_empty() {
            return Err(ConfigError::Invalid("version must not be empty".into()));
        }

        if !matches!(self.origin.scheme(), "http" | "https") || self.origin.host().is_none() {
            return Err(ConfigError::Invalid(format!(
                "origin must be an http(s) URL with a host: {}",
                self.origin
            )));
        }

        if self.api_prefix.is_empty() || !self.api_prefix.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "api_prefix must start with '/': {:?}",
                self.api_prefix
            )));
        }

        if let Some(bad) = self.precache.iter().find(|p| !p.starts_with('/')) {
            return Err(ConfigError::Invalid(format!(
                "precache path must start with '/': {}",
                bad
            )));
        }

        if self.image_namespace.is_empty() {
            return Err(ConfigError::Invalid("image_namespace must not be empty".into()));
        }

        // The image namespace would be purged at activation if it looked versioned.
        if self.image_namespace.starts_with(&self.app_namespace_prefix) {
            return Err(ConfigError::Invalid(format!(
                "image_namespace {:?} collides with app_namespace_prefix {:?}",
                self.image_namespace, self.app_namespace_prefix
            )));
        }

        Ok(())
    }

    /// Name of this deployment's application namespace.
    pub fn app_namespace(&self) -> String {
        format!("{}{}", self.app_namespace_prefix, self.version)
    }

    /// The application root document URL.
    pub fn root_url(&self) -> Url {
        let mut root = self.origin.clone();
        root.set_path("/");
        root.set_query(None);
        root.set_fragment(None);
        root
    }

    /// Resolve an origin-relative path (e.g. a precache entry).
    pub fn resolve(&self, path: &str) -> Result<Url, url::ParseError> {
        self.origin.join(path)
    }
}

/// Presentation of push notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Notification title.
    #[serde(default = "default_title")]
    pub title: String,

    /// Icon URL path.
    #[serde(default = "default_icon")]
    pub icon: String,

    /// Badge URL path.
    #[serde(default = "default_badge")]
    pub badge: String,

    /// Body used when the push payload is empty.
    #[serde(default = "default_body")]
    pub default_body: String,

    /// Vibration pattern in milliseconds.
    #[serde(default = "default_vibrate")]
    pub vibrate: Vec<u32>,

    /// Type tag of the message broadcast to clients after activation.
    #[serde(default = "default_update_message_type")]
    pub update_message_type: String,
}

fn default_title() -> String {
    "Explore new destinations".to_string()
}

fn default_icon() -> String {
    "/icons/icon-192x192.png".to_string()
}

fn default_badge() -> String {
    "/icons/badge-72x72.png".to_string()
}

fn default_body() -> String {
    "You have a new update".to_string()
}

fn default_vibrate() -> Vec<u32> {
    vec![100, 50, 100]
}

fn default_update_message_type() -> String {
    "APP_UPDATED".to_string()
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            icon: default_icon(),
            badge: default_badge(),
            default_body: default_body(),
            vibrate: default_vibrate(),
            update_message_type: default_update_message_type(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("https://tours.example.com").unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::new("v1", origin());
        assert!(config.validate().is_ok());
        assert_eq!(config.app_namespace(), "app-v1");
        assert_eq!(config.image_namespace, "images");
        assert!(config.skip_waiting);
        assert_eq!(config.image_cache_capacity, 500);
    }

    #[test]
    fn test_from_toml_minimal() {
        let config = EngineConfig::from_toml_str(
            r#"
            version = "2024.06.01"
            origin = "https://tours.example.com"
            trusted_image_hosts = ["images.unsplash.com", "*.cloudinary.com"]
            "#,
        )
        .unwrap();

        assert_eq!(config.version, "2024.06.01");
        assert_eq!(config.trusted_image_hosts.len(), 2);
        assert_eq!(config.precache, vec!["/", "/manifest.json"]);
        assert_eq!(config.notification.vibrate, vec![100, 50, 100]);
    }

    #[test]
    fn test_from_toml_with_notification_table() {
        let config = EngineConfig::from_toml_str(
            r#"
            version = "v2"
            origin = "https://tours.example.com"

            [notification]
            title = "Trips"
            default_body = "New deals"
            "#,
        )
        .unwrap();

        assert_eq!(config.notification.title, "Trips");
        assert_eq!(config.notification.default_body, "New deals");
        assert_eq!(config.notification.update_message_type, "APP_UPDATED");
    }

    #[test]
    fn test_rejects_empty_version() {
        let config = EngineConfig::new("  ", origin());
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_relative_precache_path() {
        let mut config = EngineConfig::new("v1", origin());
        config.precache.push("logo.png".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_non_http_origin() {
        let config = EngineConfig::new("v1", Url::parse("file:///tmp/site").unwrap());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_image_namespace_with_app_prefix() {
        let mut config = EngineConfig::new("v1", origin());
        config.image_namespace = "app-images".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_root_and_resolve() {
        let config = EngineConfig::new("v1", Url::parse("https://tours.example.com/app?x=1").unwrap());
        assert_eq!(config.root_url().as_str(), "https://tours.example.com/");
        assert_eq!(
            config.resolve("/logo.png").unwrap().as_str(),
            "https://tours.example.com/logo.png"
        );
    }
}
