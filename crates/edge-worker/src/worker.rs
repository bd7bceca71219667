//! One deployed version of the interception engine.

use std::sync::Arc;

use edge_cache::{CacheError, CacheStorage, Namespace, NamespacePolicy, RequestKey};
use edge_core::{ConfigError, EngineConfig, Request, Response, WorkerState};
use edge_data::Network;
use edge_executor::StrategyExecutor;
use edge_observability::InterceptMetrics;
use futures::future::try_join_all;
use serde::Serialize;
use tracing::{info, warn};
use url::Url;

use crate::clients::{ClientHub, UpdateMessage};

/// Errors raised by lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("cannot move worker {version} from {from} to {to}")]
    InvalidTransition {
        version: String,
        from: WorkerState,
        to: WorkerState,
    },

    #[error("precache of {url} failed: {reason}")]
    Precache { url: String, reason: String },

    #[error("cache storage: {0}")]
    Cache(#[from] CacheError),
}

/// What activation did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivationReport {
    /// The version now in control.
    pub version: String,
    /// Namespaces deleted as leftovers of earlier deployments.
    pub purged: Vec<String>,
    /// Clients claimed.
    pub claimed: usize,
    /// Clients that received the update message.
    pub notified: usize,
}

/// A deployed worker: one configuration, one application namespace, one
/// executor, moving through the [`WorkerState`] machine.
pub struct Worker {
    config: EngineConfig,
    state: WorkerState,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    executor: Arc<StrategyExecutor>,
}

impl Worker {
    /// Create a worker in the `Installing` state.
    pub fn new(
        config: EngineConfig,
        storage: Arc<dyn CacheStorage>,
        network: Arc<dyn Network>,
        metrics: Arc<InterceptMetrics>,
    ) -> Self {
        let executor = StrategyExecutor::new(&config, storage.clone(), network.clone())
            .with_metrics(metrics);

        Self {
            config,
            state: WorkerState::Installing,
            storage,
            network,
            executor: Arc::new(executor),
        }
    }

    /// Deployment version.
    pub fn version(&self) -> &str {
        &self.config.version
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// The configuration this worker was deployed with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The executor answering intercepted requests.
    pub fn executor(&self) -> &Arc<StrategyExecutor> {
        &self.executor
    }

    /// Whether the worker asks to activate as soon as it is installed.
    pub fn skips_waiting(&self) -> bool {
        self.config.skip_waiting
    }

    fn transition(&mut self, to: WorkerState) -> Result<(), LifecycleError> {
        if !self.state.can_transition_to(to) {
            return Err(LifecycleError::InvalidTransition {
                version: self.config.version.clone(),
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }

    /// Create the application namespace and fill it with the precache
    /// manifest.
    ///
    /// All or nothing: every entry must fetch with a 200 or the worker moves
    /// to `Failed`. A namespace this install created is discarded; one that
    /// already existed (a redeploy of the live version) is left alone.
    pub async fn install(&mut self) -> Result<(), LifecycleError> {
        if self.state != WorkerState::Installing {
            return Err(LifecycleError::InvalidTransition {
                version: self.config.version.clone(),
                from: self.state,
                to: WorkerState::Waiting,
            });
        }

        let namespace = self.config.app_namespace();
        let existed = match self.storage.has(&namespace).await {
            Ok(existed) => existed,
            Err(err) => {
                self.transition(WorkerState::Failed)?;
                return Err(err.into());
            }
        };

        match self.precache(&namespace).await {
            Ok(count) => {
                info!(version = %self.config.version, namespace = %namespace, entries = count, "installed");
                self.transition(WorkerState::Waiting)
            }
            Err(err) => {
                warn!(version = %self.config.version, error = %err, "install failed");
                if !existed {
                    if let Err(cleanup) = self.storage.delete_namespace(&namespace).await {
                        warn!(namespace = %namespace, error = %cleanup, "could not discard partial precache");
                    }
                }
                self.transition(WorkerState::Failed)?;
                Err(err)
            }
        }
    }

    async fn precache(&self, namespace: &str) -> Result<usize, LifecycleError> {
        let urls = self
            .config
            .precache
            .iter()
            .map(|path| {
                self.config.resolve(path).map_err(|e| LifecycleError::Precache {
                    url: path.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<Url>, _>>()?;

        let responses = try_join_all(urls.iter().map(|url| self.fetch_manifest_entry(url))).await?;

        let app = Namespace::open(self.storage.clone(), namespace).await?;
        for (url, response) in urls.iter().zip(responses) {
            app.put(RequestKey::get(url), response).await?;
        }
        Ok(urls.len())
    }

    async fn fetch_manifest_entry(&self, url: &Url) -> Result<Response, LifecycleError> {
        let response = self
            .network
            .fetch(&Request::get(url.clone()))
            .await
            .map_err(|e| LifecycleError::Precache {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        if !response.is_ok() {
            return Err(LifecycleError::Precache {
                url: url.to_string(),
                reason: format!("status {}", response.status()),
            });
        }
        Ok(response)
    }

    /// Take control: purge stale namespaces, apply the image namespace cap,
    /// claim clients and tell them the new version.
    pub async fn activate(&mut self, clients: &ClientHub) -> Result<ActivationReport, LifecycleError> {
        if !self.state.can_transition_to(WorkerState::Active) {
            return Err(LifecycleError::InvalidTransition {
                version: self.config.version.clone(),
                from: self.state,
                to: WorkerState::Active,
            });
        }

        let keep = [self.config.app_namespace(), self.config.image_namespace.clone()];
        let mut purged = Vec::new();
        for name in self.storage.namespaces().await? {
            if keep.contains(&name) {
                continue;
            }
            if self.storage.delete_namespace(&name).await? {
                info!(namespace = %name, "purged stale namespace");
                purged.push(name);
            }
        }

        self.storage
            .set_policy(
                &self.config.image_namespace,
                NamespacePolicy::from_capacity(self.config.image_cache_capacity),
            )
            .await?;

        self.transition(WorkerState::Active)?;

        let claimed = clients.claim(&self.config.version);
        let notified = clients.broadcast(UpdateMessage::new(
            self.config.notification.update_message_type.clone(),
            self.config.version.clone(),
        ));

        info!(version = %self.config.version, purged = purged.len(), claimed, "activated");

        Ok(ActivationReport {
            version: self.config.version.clone(),
            purged,
            claimed,
            notified,
        })
    }

    /// Hand over to a newer version.
    pub fn supersede(&mut self) -> Result<(), LifecycleError> {
        self.transition(WorkerState::Superseded)?;
        info!(version = %self.config.version, "superseded");
        Ok(())
    }
}
