//! Resource classification.

use std::fmt;

use edge_core::{Destination, EngineConfig, Request, RequestMode};
use edge_security::TrustedHosts;
use serde::Serialize;
use url::Url;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "svg", "avif", "ico", "bmp"];
const HTML_EXTENSIONS: &[&str] = &["html", "htm"];
const SCRIPT_STYLE_EXTENSIONS: &[&str] = &["js", "mjs", "css"];

/// Category of an intercepted GET request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum Classification {
    /// An image, same-origin or external. `trusted` is false only for
    /// external hosts missing from the allow-list.
    Image { trusted: bool },
    /// A page load.
    NavigationDocument,
    /// A same-origin script or stylesheet.
    ScriptOrStyle,
    /// Any other same-origin asset.
    OtherStatic,
    /// A dynamic API call.
    Api,
    /// A non-image request to another origin.
    CrossOriginUntrusted,
}

impl Classification {
    /// Whether the executor handles this request at all.
    pub fn is_intercepted(&self) -> bool {
        !matches!(self, Self::Api | Self::CrossOriginUntrusted)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image { trusted: true } => write!(f, "image"),
            Self::Image { trusted: false } => write!(f, "image (untrusted host)"),
            Self::NavigationDocument => write!(f, "navigation-document"),
            Self::ScriptOrStyle => write!(f, "script-or-style"),
            Self::OtherStatic => write!(f, "other-static"),
            Self::Api => write!(f, "api"),
            Self::CrossOriginUntrusted => write!(f, "cross-origin-untrusted"),
        }
    }
}

/// Maps a request to its [`Classification`].
///
/// Pure: the result depends only on the request and the classifier's
/// configuration. Rules apply in priority order:
///
/// 1. non-GET is ignored (`None`)
/// 2. a path under the API prefix is `Api`
/// 3. an image extension, media-transform path or image destination is
///    `Image` from any origin, as is any request to a trusted image host
/// 4. anything else cross-origin is `CrossOriginUntrusted`
/// 5. navigation mode, document destination, `/` or an HTML extension is
///    `NavigationDocument`
/// 6. a script or stylesheet extension is `ScriptOrStyle`
/// 7. everything else is `OtherStatic`
#[derive(Debug, Clone)]
pub struct Classifier {
    origin: Url,
    api_prefix: String,
    image_path_patterns: Vec<String>,
    trusted_hosts: TrustedHosts,
}

impl Classifier {
    /// Create a classifier for an origin with default rules and an empty
    /// allow-list.
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            api_prefix: "/api/".to_string(),
            image_path_patterns: Vec::new(),
            trusted_hosts: TrustedHosts::new(),
        }
    }

    /// Build from engine configuration.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            origin: config.origin.clone(),
            api_prefix: config.api_prefix.clone(),
            image_path_patterns: config.image_path_patterns.clone(),
            trusted_hosts: TrustedHosts::from_entries(&config.trusted_image_hosts),
        }
    }

    /// Set the API path prefix.
    pub fn with_api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_prefix = prefix.into();
        self
    }

    /// Add a media-transform path fragment.
    pub fn with_image_path_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.image_path_patterns.push(pattern.into());
        self
    }

    /// Replace the trusted image host allow-list.
    pub fn with_trusted_hosts(mut self, hosts: TrustedHosts) -> Self {
        self.trusted_hosts = hosts;
        self
    }

    /// The application origin.
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Classify a request. Returns `None` for non-GET requests.
    pub fn classify(&self, request: &Request) -> Option<Classification> {
        if !request.is_get() {
            return None;
        }

        let path = request.path();
        if self.is_api(path) {
            return Some(Classification::Api);
        }

        let extension = extension(path);
        let same_origin = request.is_same_origin(&self.origin);
        let trusted_host = !same_origin && self.trusted_hosts.is_trusted_url(&request.url);

        if trusted_host || self.is_image(request, extension.as_deref()) {
            return Some(Classification::Image {
                trusted: same_origin || trusted_host,
            });
        }

        if !same_origin {
            return Some(Classification::CrossOriginUntrusted);
        }

        let is_ext = |set: &[&str]| extension.as_deref().is_some_and(|e| set.contains(&e));

        if request.mode == RequestMode::Navigate
            || request.destination == Destination::Document
            || path == "/"
            || is_ext(HTML_EXTENSIONS)
        {
            return Some(Classification::NavigationDocument);
        }

        if is_ext(SCRIPT_STYLE_EXTENSIONS) {
            return Some(Classification::ScriptOrStyle);
        }

        Some(Classification::OtherStatic)
    }

    /// The prefix itself, or the prefix without its trailing slash.
    fn is_api(&self, path: &str) -> bool {
        let bare = self.api_prefix.trim_end_matches('/');
        path.starts_with(&self.api_prefix) || (!bare.is_empty() && path == bare)
    }

    fn is_image(&self, request: &Request, extension: Option<&str>) -> bool {
        request.destination == Destination::Image
            || extension.is_some_and(|e| IMAGE_EXTENSIONS.contains(&e))
            || self
                .image_path_patterns
                .iter()
                .any(|p| !p.is_empty() && request.path().contains(p.as_str()))
    }
}

/// Lowercased extension of the last path segment.
fn extension(path: &str) -> Option<String> {
    let segment = path.rsplit('/').next()?;
    let (stem, ext) = segment.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    fn classifier() -> Classifier {
        let config = EngineConfig {
            trusted_image_hosts: vec!["images.unsplash.com".into(), "*.cloudinary.com".into()],
            ..EngineConfig::new("v1", Url::parse("https://tours.example.com").unwrap())
        };
        Classifier::from_config(&config)
    }

    fn get(url: &str) -> Request {
        Request::parse(Method::GET, url).unwrap()
    }

    fn classify(request: Request) -> Option<Classification> {
        classifier().classify(&request)
    }

    #[test]
    fn test_non_get_is_ignored() {
        let post = Request::parse(Method::POST, "https://tours.example.com/photo.jpg").unwrap();
        assert_eq!(classify(post), None);
    }

    #[test]
    fn test_api_beats_image() {
        assert_eq!(
            classify(get("https://tours.example.com/api/tours")),
            Some(Classification::Api)
        );
        assert_eq!(
            classify(get("https://tours.example.com/api/avatar.png")),
            Some(Classification::Api)
        );
    }

    #[test]
    fn test_same_origin_image_by_extension() {
        assert_eq!(
            classify(get("https://tours.example.com/photo.JPG")),
            Some(Classification::Image { trusted: true })
        );
    }

    #[test]
    fn test_image_by_destination_and_transform_path() {
        let by_dest = get("https://tours.example.com/render?id=3").with_destination(Destination::Image);
        assert_eq!(classify(by_dest), Some(Classification::Image { trusted: true }));

        assert_eq!(
            classify(get("https://tours.example.com/_next/image?url=%2Fa&w=640")),
            Some(Classification::Image { trusted: true })
        );
    }

    #[test]
    fn test_cross_origin_images_check_allow_list() {
        assert_eq!(
            classify(get("https://images.unsplash.com/photo-1?w=800")),
            Some(Classification::Image { trusted: true })
        );
        assert_eq!(
            classify(get("https://res.cloudinary.com/demo/image/upload/beach")),
            Some(Classification::Image { trusted: true })
        );
        assert_eq!(
            classify(get("https://evil.example.net/cat.png")),
            Some(Classification::Image { trusted: false })
        );
    }

    #[test]
    fn test_trusted_host_without_image_hints_is_image() {
        let classifier = classifier();
        for url in [
            "https://images.unsplash.com/photo-1?w=800&q=80",
            "https://res.cloudinary.com/demo/fetch/abc123",
        ] {
            assert_eq!(
                classifier.classify(&get(url)),
                Some(Classification::Image { trusted: true }),
                "{}",
                url
            );
        }
        // Allow-list membership is by host, not registrable domain.
        assert_eq!(
            classifier.classify(&get("https://unsplash.com/photos/1")),
            Some(Classification::CrossOriginUntrusted)
        );
    }

    #[test]
    fn test_bare_api_prefix_is_api() {
        assert_eq!(
            classify(get("https://tours.example.com/api")),
            Some(Classification::Api)
        );
        assert_eq!(
            classify(get("https://tours.example.com/apiary.html")),
            Some(Classification::NavigationDocument)
        );
        let custom = Classifier::new(Url::parse("https://tours.example.com").unwrap())
            .with_api_prefix("/v1/");
        assert_eq!(
            custom.classify(&get("https://tours.example.com/v1")),
            Some(Classification::Api)
        );
    }

    #[test]
    fn test_cross_origin_non_image() {
        assert_eq!(
            classify(get("https://cdn.other.com/lib.js")),
            Some(Classification::CrossOriginUntrusted)
        );
        assert_eq!(
            classify(Request::navigate(Url::parse("https://pay.gateway.com/checkout").unwrap())),
            Some(Classification::CrossOriginUntrusted)
        );
    }

    #[test]
    fn test_navigation_document() {
        let cases = [
            Request::navigate(Url::parse("https://tours.example.com/tours/42").unwrap()),
            get("https://tours.example.com/"),
            get("https://tours.example.com/legal/terms.html"),
            get("https://tours.example.com/about").with_destination(Destination::Document),
        ];
        for request in cases {
            assert_eq!(classify(request), Some(Classification::NavigationDocument));
        }
    }

    #[test]
    fn test_script_or_style() {
        assert_eq!(
            classify(get("https://tours.example.com/static/app.js")),
            Some(Classification::ScriptOrStyle)
        );
        assert_eq!(
            classify(get("https://tours.example.com/static/site.css?v=3")),
            Some(Classification::ScriptOrStyle)
        );
    }

    #[test]
    fn test_other_static() {
        assert_eq!(
            classify(get("https://tours.example.com/manifest.json")),
            Some(Classification::OtherStatic)
        );
        assert_eq!(
            classify(get("https://tours.example.com/fonts/inter.woff2")),
            Some(Classification::OtherStatic)
        );
    }

    #[test]
    fn test_is_intercepted() {
        assert!(Classification::Image { trusted: false }.is_intercepted());
        assert!(Classification::OtherStatic.is_intercepted());
        assert!(!Classification::Api.is_intercepted());
        assert!(!Classification::CrossOriginUntrusted.is_intercepted());
    }

    #[test]
    fn test_extension() {
        assert_eq!(extension("/a/b.PNG").as_deref(), Some("png"));
        assert_eq!(extension("/a.b/c"), None);
        assert_eq!(extension("/.hidden"), None);
        assert_eq!(extension("/"), None);
    }
}
