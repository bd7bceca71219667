//! Registration: the active and waiting workers for one origin.

use std::sync::Arc;

use edge_cache::CacheStorage;
use edge_core::{EngineConfig, Request, Response, ResponseSource, WorkerState};
use edge_data::{FetchError, Network};
use edge_executor::{Classification, Resolution, StrategyExecutor};
use edge_observability::InterceptMetrics;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::clients::ClientHub;
use crate::worker::{ActivationReport, LifecycleError, Worker};

/// Result of a deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    /// The new version took control.
    Activated(ActivationReport),
    /// Installed; waiting for [`Registration::promote_waiting`].
    Waiting { version: String },
}

/// Answer to a fetch routed through the registration.
#[derive(Debug)]
pub enum Handled {
    /// Answered by a strategy.
    Intercepted(Resolution),
    /// Forwarded to the network untouched.
    Passthrough {
        classification: Option<Classification>,
        outcome: Result<Response, FetchError>,
    },
}

impl Handled {
    /// Where the answer came from.
    pub fn source(&self) -> ResponseSource {
        match self {
            Self::Intercepted(resolution) => resolution.source,
            Self::Passthrough { .. } => ResponseSource::Passthrough,
        }
    }

    /// The classification, when the request was classified.
    pub fn classification(&self) -> Option<Classification> {
        match self {
            Self::Intercepted(resolution) => Some(resolution.classification),
            Self::Passthrough { classification, .. } => *classification,
        }
    }

    /// The response, if there is one.
    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::Intercepted(resolution) => resolution.response(),
            Self::Passthrough { outcome, .. } => outcome.as_ref().ok(),
        }
    }

    /// Take the outcome.
    pub fn into_outcome(self) -> Result<Response, FetchError> {
        match self {
            Self::Intercepted(resolution) => resolution.into_outcome(),
            Self::Passthrough { outcome, .. } => outcome,
        }
    }

    /// Wait for any background cache write to finish.
    pub async fn settle(&mut self) {
        if let Self::Intercepted(resolution) = self {
            resolution.settle().await;
        }
    }
}

#[derive(Default)]
struct Slots {
    active: Option<Worker>,
    waiting: Option<Worker>,
}

/// Owns the worker slots for an origin and routes every fetch.
///
/// Deployments swap workers under a write lock; fetches only take the read
/// lock long enough to clone the active executor.
pub struct Registration {
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    clients: Arc<ClientHub>,
    metrics: Arc<InterceptMetrics>,
    slots: RwLock<Slots>,
}

impl Registration {
    /// Create an empty registration. Until a worker activates, every
    /// request passes through.
    pub fn new(storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>) -> Self {
        Self {
            storage,
            network,
            clients: Arc::new(ClientHub::new()),
            metrics: Arc::new(InterceptMetrics::new()),
            slots: RwLock::new(Slots::default()),
        }
    }

    /// Share a client hub.
    pub fn with_clients(mut self, clients: Arc<ClientHub>) -> Self {
        self.clients = clients;
        self
    }

    /// Share a metrics sink.
    pub fn with_metrics(mut self, metrics: Arc<InterceptMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Connected clients.
    pub fn clients(&self) -> &Arc<ClientHub> {
        &self.clients
    }

    /// Interception counters across all workers.
    pub fn metrics(&self) -> &Arc<InterceptMetrics> {
        &self.metrics
    }

    /// Version of the active worker.
    pub async fn active_version(&self) -> Option<String> {
        self.slots
            .read()
            .await
            .active
            .as_ref()
            .map(|w| w.version().to_string())
    }

    /// Version of the waiting worker.
    pub async fn waiting_version(&self) -> Option<String> {
        self.slots
            .read()
            .await
            .waiting
            .as_ref()
            .map(|w| w.version().to_string())
    }

    /// Install a new version and, if it skips waiting, activate it.
    ///
    /// A failed install leaves the current active worker in control.
    pub async fn deploy(&self, config: EngineConfig) -> Result<DeployOutcome, LifecycleError> {
        config.validate()?;

        let mut worker = Worker::new(
            config,
            self.storage.clone(),
            self.network.clone(),
            self.metrics.clone(),
        );
        worker.install().await?;

        let mut slots = self.slots.write().await;
        if let Some(mut replaced) = slots.waiting.take() {
            replaced.supersede()?;
        }

        if worker.skips_waiting() {
            let report = self.activate(&mut slots, worker).await?;
            return Ok(DeployOutcome::Activated(report));
        }

        let version = worker.version().to_string();
        info!(version = %version, "installed, waiting");
        slots.waiting = Some(worker);
        Ok(DeployOutcome::Waiting { version })
    }

    /// Activate the waiting worker once no client is connected.
    ///
    /// Returns `None` when nothing is waiting or clients are still open.
    pub async fn promote_waiting(&self) -> Result<Option<ActivationReport>, LifecycleError> {
        let mut slots = self.slots.write().await;
        if slots.waiting.is_none() {
            return Ok(None);
        }
        if !self.clients.is_empty() {
            debug!(clients = self.clients.len(), "clients still open, keep waiting");
            return Ok(None);
        }

        match slots.waiting.take() {
            Some(worker) => self.activate(&mut slots, worker).await.map(Some),
            None => Ok(None),
        }
    }

    async fn activate(&self, slots: &mut Slots, mut worker: Worker) -> Result<ActivationReport, LifecycleError> {
        let report = worker.activate(&self.clients).await?;
        if let Some(mut previous) = slots.active.take() {
            if previous.state() == WorkerState::Active {
                previous.supersede()?;
            }
        }
        slots.active = Some(worker);
        Ok(report)
    }

    /// Route one request.
    ///
    /// Intercepted requests run the active worker's strategy; everything
    /// else, and every request before activation, goes to the network
    /// unmodified.
    pub async fn handle_fetch(&self, request: &Request) -> Handled {
        let executor: Option<Arc<StrategyExecutor>> = self
            .slots
            .read()
            .await
            .active
            .as_ref()
            .map(|w| w.executor().clone());

        let classification = match &executor {
            Some(executor) => match executor.respond(request).await {
                Some(resolution) => return Handled::Intercepted(resolution),
                None => executor.classifier().classify(request),
            },
            None => None,
        };

        let outcome = self.network.fetch(request).await;
        if let Err(err) = &outcome {
            debug!(request_id = %request.id, url = %request.url, error = %err, "passthrough fetch failed");
        }
        self.metrics.record(ResponseSource::Passthrough);

        Handled::Passthrough {
            classification,
            outcome,
        }
    }
}
