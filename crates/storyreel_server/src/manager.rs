//! The process-wide service lifecycle manager.

use crate::{FailureReason, ModelPreferenceList, ServiceBackend, ServiceConfig, ServiceStatus};
use async_trait::async_trait;
use derive_getters::Getters;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use storyreel_core::{GenerateRequest, InferenceDriver};
use storyreel_error::{ServerError, StoryreelResult};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Outcome of [`ServiceManager::ensure_ready`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Getters)]
pub struct ReadyReport {
    /// Service answered its liveness probe
    online: bool,
    /// Service holds at least one model
    model_ready: bool,
    /// Status after the attempt settled
    status: ServiceStatus,
}

/// Snapshot for status displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Getters)]
pub struct StatusReport {
    /// Service answered its liveness probe
    online: bool,
    /// Service holds at least one model
    model_ready: bool,
    /// Preferred installed model, if any matched
    active_model: Option<String>,
    /// Installed model names
    models: Vec<String>,
    /// Current lifecycle status
    status: ServiceStatus,
}

#[derive(Debug, Default)]
struct Shared {
    status: ServiceStatus,
    best_model: Option<String>,
}

struct Inner<B> {
    backend: B,
    config: ServiceConfig,
    preferences: ModelPreferenceList,
    state: watch::Sender<Shared>,
}

/// Owner of the service status and the cached model choice.
///
/// Cloning is cheap and every clone shares the same state. Status reads never
/// block; at most one provisioning attempt runs at a time and concurrent
/// callers wait on its outcome instead of starting their own.
pub struct ServiceManager<B> {
    inner: Arc<Inner<B>>,
}

impl<B> Clone for ServiceManager<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: ServiceBackend> ServiceManager<B> {
    /// Manager with the built-in model preferences.
    pub fn new(backend: B, config: ServiceConfig) -> Self {
        Self::with_preferences(backend, config, ModelPreferenceList::default())
    }

    /// Manager with a custom model preference order.
    pub fn with_preferences(
        backend: B,
        config: ServiceConfig,
        preferences: ModelPreferenceList,
    ) -> Self {
        let (state, _) = watch::channel(Shared::default());
        Self {
            inner: Arc::new(Inner {
                backend,
                config,
                preferences,
                state,
            }),
        }
    }

    /// Service configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.inner.config
    }

    /// Current status.
    pub fn status(&self) -> ServiceStatus {
        self.inner.state.borrow().status
    }

    /// Wait until the status satisfies `predicate` and return it.
    pub async fn wait_until<F>(&self, mut predicate: F) -> ServiceStatus
    where
        F: FnMut(ServiceStatus) -> bool,
    {
        let mut rx = self.inner.state.subscribe();
        let settled = match rx.wait_for(|shared| predicate(shared.status)).await {
            Ok(shared) => shared.status,
            Err(_) => self.status(),
        };
        settled
    }

    /// Liveness probe. Never fails.
    pub async fn is_online(&self) -> bool {
        self.inner.backend.is_online().await
    }

    /// Query the service and pick the first installed model in preference order.
    ///
    /// Uncached. Returns `None` if the service is unreachable or nothing matches.
    #[instrument(skip(self))]
    pub async fn detect_best_installed_model(&self) -> Option<String> {
        let installed = match self.inner.backend.installed_models().await {
            Ok(models) => models,
            Err(e) => {
                debug!(error = %e, "Could not list installed models");
                return None;
            }
        };
        let best = self.inner.preferences.select(&installed);
        debug!(installed = installed.len(), best = ?best, "Detected best installed model");
        best
    }

    /// Best installed model, cached until the next successful provisioning
    /// or [`invalidate`](Self::invalidate).
    pub async fn best_model(&self) -> Option<String> {
        let cached = self.inner.state.borrow().best_model.clone();
        if cached.is_some() {
            return cached;
        }
        let found = self.detect_best_installed_model().await;
        if let Some(model) = &found {
            self.inner
                .state
                .send_modify(|shared| shared.best_model = Some(model.clone()));
        }
        found
    }

    /// Model used when a request names none: the best installed model, else
    /// the configured default.
    pub async fn active_model(&self) -> String {
        match self.best_model().await {
            Some(model) => model,
            None => self.inner.config.default_model.clone(),
        }
    }

    /// Probe the service and summarize it for display.
    #[instrument(skip(self))]
    pub async fn report(&self) -> StatusReport {
        let online = self.is_online().await;
        let models = if online {
            self.inner.backend.installed_models().await.unwrap_or_default()
        } else {
            Vec::new()
        };
        let active_model = if models.is_empty() {
            None
        } else {
            self.best_model().await
        };
        StatusReport {
            online,
            model_ready: !models.is_empty(),
            active_model,
            models,
            status: self.status(),
        }
    }

    /// Drop a `ready` status back to `idle` and forget the cached model.
    pub fn invalidate(&self) {
        self.inner.state.send_if_modified(|shared| {
            let was_ready = shared.status == ServiceStatus::Ready;
            if was_ready {
                info!(from = %shared.status, to = %ServiceStatus::Idle, "Service status invalidated");
                shared.status = ServiceStatus::Idle;
            }
            let had_model = shared.best_model.take().is_some();
            was_ready || had_model
        });
    }

    /// Make sure the service is installed, running and holds a model.
    ///
    /// Starts a provisioning attempt unless one is already in flight or the
    /// service is already `ready`, then waits for the outcome. Never fails:
    /// problems surface as a `failed:<reason>` status. Outside a Tokio runtime
    /// nothing is started and the current status is reported as not ready.
    #[instrument(skip(self))]
    pub async fn ensure_ready(&self) -> ReadyReport {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime; provisioning skipped");
            return ReadyReport {
                online: false,
                model_ready: false,
                status: self.status(),
            };
        };

        if self.try_claim() {
            self.spawn_provisioning(&handle);
        } else {
            debug!(status = %self.status(), "Provisioning already settled or in flight");
        }

        let status = self.wait_until(|status| !status.is_in_flight()).await;
        if status == ServiceStatus::Ready {
            return ReadyReport {
                online: true,
                model_ready: true,
                status,
            };
        }
        ReadyReport {
            online: self.is_online().await,
            model_ready: false,
            status,
        }
    }

    /// Fire-and-forget provisioning.
    ///
    /// Returns `false` without doing anything when an attempt is already in
    /// flight, the service is `ready`, or there is no Tokio runtime.
    pub fn ensure_ready_in_background(&self) -> bool {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime; background provisioning skipped");
            return false;
        };
        if !self.try_claim() {
            debug!(status = %self.status(), "Background provisioning not needed");
            return false;
        }
        self.spawn_provisioning(&handle);
        true
    }

    fn try_claim(&self) -> bool {
        self.inner.state.send_if_modified(|shared| {
            if !shared.status.can_start() {
                return false;
            }
            info!(from = %shared.status, to = %ServiceStatus::Checking, "Service status");
            shared.status = ServiceStatus::Checking;
            true
        })
    }

    fn spawn_provisioning(&self, handle: &tokio::runtime::Handle) {
        let this = self.clone();
        handle.spawn(async move {
            let outcome = this.provision().await;
            this.finish(outcome);
        });
    }

    fn set_status(&self, to: ServiceStatus) {
        self.inner.state.send_modify(|shared| {
            info!(from = %shared.status, to = %to, "Service status");
            shared.status = to;
        });
    }

    fn finish(&self, outcome: Result<(), FailureReason>) {
        self.inner.state.send_modify(|shared| {
            let to = match outcome {
                Ok(()) => {
                    shared.best_model = None;
                    ServiceStatus::Ready
                }
                Err(reason) => ServiceStatus::Failed(reason),
            };
            info!(from = %shared.status, to = %to, "Service status");
            shared.status = to;
        });
    }

    async fn provision(&self) -> Result<(), FailureReason> {
        let backend = &self.inner.backend;

        let mut binary = backend.locate().await;
        if !backend.is_online().await {
            let located = match binary.take() {
                Some(path) => path,
                None => self.install().await?,
            };
            self.start(&located).await?;
            binary = Some(located);
        }

        let models = backend.installed_models().await.unwrap_or_else(|e| {
            warn!(error = %e, "Could not list models; assuming none");
            Vec::new()
        });
        if !models.is_empty() {
            debug!(count = models.len(), "Models already installed");
            return Ok(());
        }

        let Some(binary) = binary else {
            error!("Service has no models and no binary to pull with");
            return Err(FailureReason::NotFound);
        };
        self.set_status(ServiceStatus::Pulling);
        let model = &self.inner.config.default_model;
        backend
            .pull(&binary, model)
            .await
            .map_err(|e| failed(FailureReason::Pull, e))?;
        info!(model = %model, "Default model pulled");
        Ok(())
    }

    async fn install(&self) -> Result<PathBuf, FailureReason> {
        let backend = &self.inner.backend;

        self.set_status(ServiceStatus::Downloading);
        let artifact = backend
            .download_installer()
            .await
            .map_err(|e| failed(FailureReason::Download, e))?;

        self.set_status(ServiceStatus::Installing);
        backend
            .install(&artifact)
            .await
            .map_err(|e| failed(FailureReason::Install, e))?;

        backend.locate().await.ok_or_else(|| {
            error!("Installer finished but no service binary was found");
            FailureReason::NotFound
        })
    }

    async fn start(&self, binary: &Path) -> Result<(), FailureReason> {
        let backend = &self.inner.backend;

        self.set_status(ServiceStatus::Starting);
        backend
            .start(binary)
            .await
            .map_err(|e| failed(FailureReason::Start, e))?;

        let deadline = Instant::now() + self.inner.config.start_timeout();
        loop {
            if backend.is_online().await {
                return Ok(());
            }
            if Instant::now() >= deadline {
                error!(
                    seconds = self.inner.config.start_timeout_secs,
                    "Service did not come up in time"
                );
                return Err(FailureReason::Start);
            }
            tokio::time::sleep(self.inner.config.start_poll_interval()).await;
        }
    }
}

fn failed(reason: FailureReason, err: ServerError) -> FailureReason {
    error!(%reason, error = %err, "Provisioning step failed");
    reason
}

#[async_trait]
impl<B: ServiceBackend> InferenceDriver for ServiceManager<B> {
    async fn is_online(&self) -> bool {
        ServiceManager::is_online(self).await
    }

    async fn generate(&self, request: &GenerateRequest) -> StoryreelResult<String> {
        let model = match &request.model {
            Some(model) => model.clone(),
            None => ServiceManager::active_model(self).await,
        };
        Ok(self.inner.backend.generate(&model, request).await?)
    }
}
