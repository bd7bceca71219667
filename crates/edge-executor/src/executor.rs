//! Strategy execution against the cache store and the network.

use std::sync::Arc;

use edge_cache::{CacheExplainHeaders, CacheStatus, CacheStorage, Namespace, RequestKey};
use edge_core::{EngineConfig, Request, Response, ResponseSource};
use edge_data::{FetchError, Network};
use edge_observability::InterceptMetrics;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use url::Url;

use crate::classify::{Classification, Classifier};
use crate::strategy::{NamespaceKind, Strategy};

/// Outcome of an intercepted request.
#[derive(Debug)]
pub struct Resolution {
    /// How the request was classified.
    pub classification: Classification,
    /// Where the answer came from.
    pub source: ResponseSource,
    /// The answer, or the network error when nothing could answer.
    pub outcome: Result<Response, FetchError>,
    write_back: Option<JoinHandle<()>>,
}

impl Resolution {
    fn new(
        classification: Classification,
        source: ResponseSource,
        outcome: Result<Response, FetchError>,
    ) -> Self {
        Self {
            classification,
            source,
            outcome,
            write_back: None,
        }
    }

    /// The response, if there is one.
    pub fn response(&self) -> Option<&Response> {
        self.outcome.as_ref().ok()
    }

    /// Take the outcome. A pending background write keeps running.
    pub fn into_outcome(self) -> Result<Response, FetchError> {
        self.outcome
    }

    /// Whether a background cache write is still attached.
    pub fn has_pending_write(&self) -> bool {
        self.write_back.is_some()
    }

    /// Wait for any background cache write to finish.
    pub async fn settle(&mut self) {
        if let Some(handle) = self.write_back.take() {
            if let Err(err) = handle.await {
                warn!(error = %err, "background cache write aborted");
            }
        }
    }
}

/// Runs the strategy for each intercepted request.
///
/// Handlers share nothing but the cache store: every call to
/// [`respond`](Self::respond) is independent and may run concurrently with
/// any other.
pub struct StrategyExecutor {
    classifier: Classifier,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    metrics: Arc<InterceptMetrics>,
    app_namespace: String,
    image_namespace: String,
    root_url: Url,
    cache_untrusted_images: bool,
    explain_headers: bool,
}

impl StrategyExecutor {
    /// Create an executor for one deployment.
    pub fn new(
        config: &EngineConfig,
        storage: Arc<dyn CacheStorage>,
        network: Arc<dyn Network>,
    ) -> Self {
        Self {
            classifier: Classifier::from_config(config),
            storage,
            network,
            metrics: Arc::new(InterceptMetrics::new()),
            app_namespace: config.app_namespace(),
            image_namespace: config.image_namespace.clone(),
            root_url: config.root_url(),
            cache_untrusted_images: config.cache_untrusted_images,
            explain_headers: config.explain_headers,
        }
    }

    /// Share a metrics sink.
    pub fn with_metrics(mut self, metrics: Arc<InterceptMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// The classifier in use.
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// The metrics sink.
    pub fn metrics(&self) -> &Arc<InterceptMetrics> {
        &self.metrics
    }

    /// The application namespace this executor reads and writes.
    pub fn app_namespace(&self) -> &str {
        &self.app_namespace
    }

    /// Handle a request.
    ///
    /// Returns `None` when the request is not intercepted (non-GET, API,
    /// untrusted cross-origin); the caller forwards it untouched.
    pub async fn respond(&self, request: &Request) -> Option<Resolution> {
        let classification = self.classifier.classify(request)?;
        if !classification.is_intercepted() {
            return None;
        }

        let strategy = Strategy::for_classification(classification);
        let key = RequestKey::from_request(request)?;

        let mut resolution = match strategy {
            Strategy::CacheFirstImage => {
                let Classification::Image { trusted } = classification else {
                    return None;
                };
                self.image(request, key, trusted).await
            }
            Strategy::NetworkFirstNavigation => self.navigation(request, key).await,
            Strategy::NetworkFirstRefresh => self.refresh(request, key).await,
            Strategy::CacheFirstStatic => self.static_asset(request, key).await,
            Strategy::Passthrough => return None,
        };

        self.metrics.record(resolution.source);

        debug!(
            request_id = %request.id,
            url = %request.url,
            classification = %classification,
            source = %resolution.source,
            status = resolution.response().map(|r| r.status().as_u16()),
            "intercepted"
        );

        if self.explain_headers {
            if let Ok(response) = resolution.outcome.as_mut() {
                explain(strategy, resolution.source, self.namespace_for(strategy)).apply(response);
            }
        }

        Some(resolution)
    }

    async fn image(&self, request: &Request, key: RequestKey, trusted: bool) -> Resolution {
        let classification = Classification::Image { trusted };
        let images = Namespace::lazy(self.storage.clone(), &self.image_namespace);

        if let Some(cached) = lookup(&images, &key).await {
            return Resolution::new(classification, ResponseSource::Cache, Ok(cached));
        }

        match self.network.fetch(request).await {
            Ok(response) if trusted || self.cache_untrusted_images => {
                let (response, copy) = response.tee();
                store(&images, key, copy, &self.metrics).await;
                Resolution::new(classification, ResponseSource::Network, Ok(response))
            }
            Ok(response) => Resolution::new(classification, ResponseSource::Network, Ok(response)),
            Err(err) => {
                debug!(url = %request.url, error = %err, "image unreachable, answering 404");
                Resolution::new(classification, ResponseSource::Synthetic, Ok(Response::not_found()))
            }
        }
    }

    async fn navigation(&self, request: &Request, key: RequestKey) -> Resolution {
        let classification = Classification::NavigationDocument;

        let err = match self.network.fetch(request).await {
            Ok(response) => {
                return Resolution::new(classification, ResponseSource::Network, Ok(response))
            }
            Err(err) => err,
        };

        let app = Namespace::lazy(self.storage.clone(), &self.app_namespace);
        if let Some(cached) = lookup(&app, &key).await {
            debug!(url = %request.url, "offline, serving cached page");
            return Resolution::new(classification, ResponseSource::Fallback, Ok(cached));
        }

        if let Some(root) = lookup(&app, &RequestKey::get(&self.root_url)).await {
            debug!(url = %request.url, "offline, serving cached root document");
            return Resolution::new(classification, ResponseSource::Fallback, Ok(root));
        }

        debug!(url = %request.url, error = %err, "offline with nothing cached");
        Resolution::new(classification, ResponseSource::Unavailable, Err(err))
    }

    async fn refresh(&self, request: &Request, key: RequestKey) -> Resolution {
        let classification = Classification::ScriptOrStyle;
        let app = Namespace::lazy(self.storage.clone(), &self.app_namespace);

        match self.network.fetch(request).await {
            Ok(response) if response.is_ok() => {
                let (response, copy) = response.tee();
                let metrics = self.metrics.clone();
                let handle = tokio::spawn(async move {
                    store(&app, key, copy, &metrics).await;
                });

                let mut resolution =
                    Resolution::new(classification, ResponseSource::Network, Ok(response));
                resolution.write_back = Some(handle);
                resolution
            }
            Ok(response) => Resolution::new(classification, ResponseSource::Network, Ok(response)),
            Err(err) => match lookup(&app, &key).await {
                Some(cached) => {
                    debug!(url = %request.url, "offline, serving cached asset");
                    Resolution::new(classification, ResponseSource::Fallback, Ok(cached))
                }
                None => Resolution::new(classification, ResponseSource::Unavailable, Err(err)),
            },
        }
    }

    async fn static_asset(&self, request: &Request, key: RequestKey) -> Resolution {
        let classification = Classification::OtherStatic;
        let app = Namespace::lazy(self.storage.clone(), &self.app_namespace);

        if let Some(cached) = lookup(&app, &key).await {
            return Resolution::new(classification, ResponseSource::Cache, Ok(cached));
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                let (response, copy) = response.tee();
                store(&app, key, copy, &self.metrics).await;
                Resolution::new(classification, ResponseSource::Network, Ok(response))
            }
            Err(err) => Resolution::new(classification, ResponseSource::Unavailable, Err(err)),
        }
    }

    fn namespace_for(&self, strategy: Strategy) -> Option<&str> {
        match strategy.namespace()? {
            NamespaceKind::App => Some(&self.app_namespace),
            NamespaceKind::Image => Some(&self.image_namespace),
        }
    }
}

/// Cache read; a failing store is treated as a miss.
async fn lookup(namespace: &Namespace, key: &RequestKey) -> Option<Response> {
    match namespace.lookup(key).await {
        Ok(found) => found,
        Err(err) => {
            warn!(namespace = namespace.name(), key = %key, error = %err, "cache read failed");
            None
        }
    }
}

/// Cache write; failures are logged and dropped.
async fn store(namespace: &Namespace, key: RequestKey, response: Response, metrics: &InterceptMetrics) {
    let key_text = key.to_string();
    match namespace.put(key, response).await {
        Ok(true) => metrics.record_cache_write(true),
        Ok(false) => {}
        Err(err) => {
            metrics.record_cache_write(false);
            warn!(namespace = namespace.name(), key = %key_text, error = %err, "cache write failed");
        }
    }
}

fn explain(strategy: Strategy, source: ResponseSource, namespace: Option<&str>) -> CacheExplainHeaders {
    let status = match source {
        ResponseSource::Cache => CacheStatus::Hit,
        ResponseSource::Fallback => CacheStatus::Fallback,
        ResponseSource::Synthetic => CacheStatus::Synthetic,
        ResponseSource::Network if strategy.is_cache_first() => CacheStatus::Miss,
        _ => CacheStatus::Bypass,
    };

    let headers = CacheExplainHeaders::new(status);
    match namespace {
        Some(ns) => headers.with_namespace(ns),
        None => headers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use edge_cache::{CacheError, CacheResult, CachedEntry, MemoryCacheStorage, NamespacePolicy};
    use edge_data::StubNetwork;
    use http::{Method, StatusCode};

    const ORIGIN: &str = "https://tours.example.com";

    struct Harness {
        config: EngineConfig,
        storage: Arc<MemoryCacheStorage>,
        network: Arc<StubNetwork>,
        executor: StrategyExecutor,
    }

    fn harness_with(config: EngineConfig) -> Harness {
        let storage = Arc::new(
            MemoryCacheStorage::new().with_policy(
                config.image_namespace.clone(),
                NamespacePolicy::from_capacity(config.image_cache_capacity),
            ),
        );
        let network = Arc::new(StubNetwork::new());
        let executor = StrategyExecutor::new(&config, storage.clone(), network.clone());
        Harness {
            config,
            storage,
            network,
            executor,
        }
    }

    fn harness() -> Harness {
        harness_with(EngineConfig::new("v1", Url::parse(ORIGIN).unwrap()))
    }

    fn url(path: &str) -> String {
        format!("{}{}", ORIGIN, path)
    }

    fn get(path: &str) -> Request {
        Request::parse(Method::GET, &url(path)).unwrap()
    }

    async fn cached(h: &Harness, namespace: &str, full_url: &str) -> Option<Response> {
        let key = RequestKey::get(&Url::parse(full_url).unwrap());
        h.storage
            .lookup(namespace, &key)
            .await
            .unwrap()
            .map(|e| e.response)
    }

    #[tokio::test]
    async fn test_image_first_fetch_stored_then_served_from_cache() {
        let h = harness();
        h.network.set_route(&url("/photo.jpg"), Response::ok("jpeg"));

        let first = h.executor.respond(&get("/photo.jpg")).await.unwrap();
        assert_eq!(first.source, ResponseSource::Network);
        assert_eq!(first.response().unwrap().text(), "jpeg");
        assert!(cached(&h, "images", &url("/photo.jpg")).await.is_some());

        let second = h.executor.respond(&get("/photo.jpg")).await.unwrap();
        assert_eq!(second.source, ResponseSource::Cache);
        assert_eq!(second.response().unwrap().text(), "jpeg");
        assert_eq!(h.network.call_count(&url("/photo.jpg")), 1);
    }

    #[tokio::test]
    async fn test_image_non_200_not_stored_but_returned() {
        let h = harness();
        h.network
            .set_route(&url("/gone.png"), Response::new(StatusCode::GONE));

        let res = h.executor.respond(&get("/gone.png")).await.unwrap();
        assert_eq!(res.response().unwrap().status(), StatusCode::GONE);
        assert!(cached(&h, "images", &url("/gone.png")).await.is_none());
    }

    #[tokio::test]
    async fn test_image_network_failure_is_synthetic_404() {
        let h = harness();
        h.network.set_offline(true);

        let res = h.executor.respond(&get("/never.webp")).await.unwrap();
        assert_eq!(res.source, ResponseSource::Synthetic);
        assert_eq!(res.response().unwrap().status(), StatusCode::NOT_FOUND);
        assert!(!h.storage.has("images").await.unwrap());
    }

    #[tokio::test]
    async fn test_untrusted_image_not_stored_by_default() {
        let h = harness();
        let cat = "https://evil.example.net/cat.png";
        h.network.set_route(cat, Response::ok("cat"));

        let req = Request::parse(Method::GET, cat).unwrap();
        let res = h.executor.respond(&req).await.unwrap();
        assert_eq!(res.classification, Classification::Image { trusted: false });
        assert_eq!(res.response().unwrap().text(), "cat");
        assert!(cached(&h, "images", cat).await.is_none());
    }

    #[tokio::test]
    async fn test_untrusted_image_stored_when_enabled() {
        let config = EngineConfig {
            cache_untrusted_images: true,
            ..EngineConfig::new("v1", Url::parse(ORIGIN).unwrap())
        };
        let h = harness_with(config);
        let cat = "https://evil.example.net/cat.png";
        h.network.set_route(cat, Response::ok("cat"));

        h.executor
            .respond(&Request::parse(Method::GET, cat).unwrap())
            .await
            .unwrap();
        assert!(cached(&h, "images", cat).await.is_some());
    }

    #[tokio::test]
    async fn test_trusted_external_image_stored() {
        let config = EngineConfig {
            trusted_image_hosts: vec!["images.unsplash.com".into()],
            ..EngineConfig::new("v1", Url::parse(ORIGIN).unwrap())
        };
        let h = harness_with(config);
        let photo = "https://images.unsplash.com/photo-1.jpg";
        h.network.set_route(photo, Response::ok("beach"));

        h.executor
            .respond(&Request::parse(Method::GET, photo).unwrap())
            .await
            .unwrap();
        assert!(cached(&h, "images", photo).await.is_some());
    }

    #[tokio::test]
    async fn test_navigation_prefers_fresh_network() {
        let h = harness();
        let app = h.config.app_namespace();
        h.storage
            .store(
                &app,
                RequestKey::get(&Url::parse(&url("/tours")).unwrap()),
                CachedEntry::new(Response::ok("stale")),
            )
            .await
            .unwrap();
        h.network.set_route(&url("/tours"), Response::ok("fresh"));

        let res = h
            .executor
            .respond(&Request::navigate(Url::parse(&url("/tours")).unwrap()))
            .await
            .unwrap();
        assert_eq!(res.source, ResponseSource::Network);
        assert_eq!(res.response().unwrap().text(), "fresh");
        assert_eq!(cached(&h, &app, &url("/tours")).await.unwrap().text(), "stale");
    }

    #[tokio::test]
    async fn test_navigation_offline_falls_back_to_page_then_root() {
        let h = harness();
        let app = h.config.app_namespace();
        for (path, body) in [("/", "root"), ("/about", "about")] {
            h.storage
                .store(
                    &app,
                    RequestKey::get(&Url::parse(&url(path)).unwrap()),
                    CachedEntry::new(Response::ok(body)),
                )
                .await
                .unwrap();
        }
        h.network.set_offline(true);

        let nav = |p: &str| Request::navigate(Url::parse(&url(p)).unwrap());

        let about = h.executor.respond(&nav("/about")).await.unwrap();
        assert_eq!(about.source, ResponseSource::Fallback);
        assert_eq!(about.response().unwrap().text(), "about");

        let unvisited = h.executor.respond(&nav("/tours/99")).await.unwrap();
        assert_eq!(unvisited.source, ResponseSource::Fallback);
        assert_eq!(unvisited.response().unwrap().text(), "root");
    }

    #[tokio::test]
    async fn test_navigation_offline_with_nothing_cached_fails() {
        let h = harness();
        h.network.set_offline(true);

        let res = h
            .executor
            .respond(&Request::navigate(Url::parse(&url("/tours")).unwrap()))
            .await
            .unwrap();
        assert_eq!(res.source, ResponseSource::Unavailable);
        assert!(matches!(res.outcome, Err(FetchError::Connection(_))));
    }

    #[tokio::test]
    async fn test_navigation_never_written() {
        let h = harness();
        h.network.set_route(&url("/tours"), Response::ok("tours"));

        h.executor
            .respond(&Request::navigate(Url::parse(&url("/tours")).unwrap()))
            .await
            .unwrap();
        assert!(!h.storage.has(&h.config.app_namespace()).await.unwrap());
    }

    #[tokio::test]
    async fn test_script_written_in_background_and_used_offline() {
        let h = harness();
        h.network.set_route(&url("/static/app.js"), Response::ok("v1"));

        let mut res = h.executor.respond(&get("/static/app.js")).await.unwrap();
        assert_eq!(res.source, ResponseSource::Network);
        assert!(res.has_pending_write());
        res.settle().await;
        assert!(!res.has_pending_write());

        let app = h.config.app_namespace();
        assert_eq!(cached(&h, &app, &url("/static/app.js")).await.unwrap().text(), "v1");

        h.network.set_offline(true);
        let offline = h.executor.respond(&get("/static/app.js")).await.unwrap();
        assert_eq!(offline.source, ResponseSource::Fallback);
        assert_eq!(offline.response().unwrap().text(), "v1");

        let missing = h.executor.respond(&get("/static/other.css")).await.unwrap();
        assert_eq!(missing.source, ResponseSource::Unavailable);
        assert!(missing.outcome.is_err());
    }

    #[tokio::test]
    async fn test_script_refreshes_on_every_fetch() {
        let h = harness();
        h.network.set_route(&url("/site.css"), Response::ok("old"));
        h.executor.respond(&get("/site.css")).await.unwrap().settle().await;

        h.network.set_route(&url("/site.css"), Response::ok("new"));
        let mut res = h.executor.respond(&get("/site.css")).await.unwrap();
        assert_eq!(res.response().unwrap().text(), "new");
        res.settle().await;

        let app = h.config.app_namespace();
        assert_eq!(cached(&h, &app, &url("/site.css")).await.unwrap().text(), "new");
    }

    #[tokio::test]
    async fn test_other_static_cache_first() {
        let h = harness();
        h.network.set_route(&url("/manifest.json"), Response::ok("{}"));

        let first = h.executor.respond(&get("/manifest.json")).await.unwrap();
        assert_eq!(first.source, ResponseSource::Network);

        let second = h.executor.respond(&get("/manifest.json")).await.unwrap();
        assert_eq!(second.source, ResponseSource::Cache);
        assert_eq!(h.network.call_count(&url("/manifest.json")), 1);
    }

    #[tokio::test]
    async fn test_other_static_error_forwarded() {
        let h = harness();
        let res = h.executor.respond(&get("/fonts/missing.woff2")).await.unwrap();
        assert_eq!(res.response().unwrap().status(), StatusCode::NOT_FOUND);
        assert!(!h.storage.has(&h.config.app_namespace()).await.unwrap());

        h.network.set_offline(true);
        let offline = h.executor.respond(&get("/fonts/inter.woff2")).await.unwrap();
        assert_eq!(offline.source, ResponseSource::Unavailable);
    }

    #[tokio::test]
    async fn test_not_intercepted() {
        let h = harness();
        let post = Request::parse(Method::POST, &url("/photo.jpg")).unwrap();
        assert!(h.executor.respond(&post).await.is_none());
        assert!(h.executor.respond(&get("/api/tours")).await.is_none());

        let external = Request::parse(Method::GET, "https://cdn.other.com/lib.js").unwrap();
        assert!(h.executor.respond(&external).await.is_none());
        assert!(h.network.calls().is_empty());
    }

    #[tokio::test]
    async fn test_explain_headers() {
        let config = EngineConfig {
            explain_headers: true,
            ..EngineConfig::new("v1", Url::parse(ORIGIN).unwrap())
        };
        let h = harness_with(config);
        h.network.set_route(&url("/a.png"), Response::ok("png"));

        let miss = h.executor.respond(&get("/a.png")).await.unwrap();
        let headers = miss.response().unwrap().headers();
        assert_eq!(headers.get("x-cache-status").unwrap(), "MISS");
        assert_eq!(headers.get("x-cache-namespace").unwrap(), "images");

        let hit = h.executor.respond(&get("/a.png")).await.unwrap();
        assert_eq!(hit.response().unwrap().headers().get("x-cache-status").unwrap(), "HIT");
    }

    #[tokio::test]
    async fn test_metrics_recorded() {
        let h = harness();
        h.network.set_route(&url("/a.png"), Response::ok("png"));
        h.executor.respond(&get("/a.png")).await.unwrap();
        h.executor.respond(&get("/a.png")).await.unwrap();

        let snap = h.executor.metrics().snapshot();
        assert_eq!(snap.served["network"], 1);
        assert_eq!(snap.served["cache"], 1);
        assert_eq!(snap.cache_writes, 1);
    }

    /// Store that accepts reads but rejects every write.
    struct FullStorage(MemoryCacheStorage);

    #[async_trait]
    impl CacheStorage for FullStorage {
        async fn open(&self, namespace: &str) -> CacheResult<()> {
            self.0.open(namespace).await
        }
        async fn has(&self, namespace: &str) -> CacheResult<bool> {
            self.0.has(namespace).await
        }
        async fn lookup(&self, namespace: &str, key: &RequestKey) -> CacheResult<Option<CachedEntry>> {
            self.0.lookup(namespace, key).await
        }
        async fn store(&self, namespace: &str, _key: RequestKey, _entry: CachedEntry) -> CacheResult<()> {
            Err(CacheError::QuotaExceeded(namespace.to_string()))
        }
        async fn keys(&self, namespace: &str) -> CacheResult<Vec<RequestKey>> {
            self.0.keys(namespace).await
        }
        async fn namespaces(&self) -> CacheResult<Vec<String>> {
            self.0.namespaces().await
        }
        async fn delete_namespace(&self, namespace: &str) -> CacheResult<bool> {
            self.0.delete_namespace(namespace).await
        }
        async fn set_policy(&self, namespace: &str, policy: NamespacePolicy) -> CacheResult<()> {
            self.0.set_policy(namespace, policy).await
        }
    }

    #[tokio::test]
    async fn test_write_failure_does_not_affect_response() {
        let config = EngineConfig::new("v1", Url::parse(ORIGIN).unwrap());
        let network = Arc::new(StubNetwork::new());
        network.set_route(&url("/a.png"), Response::ok("png"));
        network.set_route(&url("/app.js"), Response::ok("js"));
        let executor = StrategyExecutor::new(
            &config,
            Arc::new(FullStorage(MemoryCacheStorage::new())),
            network.clone(),
        );

        let image = executor.respond(&get("/a.png")).await.unwrap();
        assert_eq!(image.response().unwrap().text(), "png");

        let mut script = executor.respond(&get("/app.js")).await.unwrap();
        script.settle().await;
        assert_eq!(script.response().unwrap().text(), "js");

        let snap = executor.metrics().snapshot();
        assert_eq!(snap.cache_write_failures, 2);
        assert_eq!(snap.cache_writes, 0);
    }
}
