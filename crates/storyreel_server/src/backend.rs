//! The side-effecting seam of the lifecycle manager.

use crate::install::{self, InstallPlan};
use crate::{OllamaClient, ServiceConfig};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use storyreel_core::GenerateRequest;
use storyreel_error::{ServerError, ServerErrorKind, ServerResult};
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Everything the lifecycle manager needs from the outside world.
///
/// The manager owns sequencing, status and caching; a backend only performs
/// single steps. Tests drive the manager with scripted backends.
#[async_trait]
pub trait ServiceBackend: Send + Sync + 'static {
    /// Liveness probe. Never fails.
    async fn is_online(&self) -> bool;

    /// Names of the models the service holds.
    async fn installed_models(&self) -> ServerResult<Vec<String>>;

    /// Path of the service binary, if installed.
    async fn locate(&self) -> Option<PathBuf>;

    /// Fetch the platform installer; returns the artifact path.
    async fn download_installer(&self) -> ServerResult<PathBuf>;

    /// Run a downloaded installer.
    async fn install(&self, artifact: &Path) -> ServerResult<()>;

    /// Launch the service in the background without waiting for it.
    async fn start(&self, binary: &Path) -> ServerResult<()>;

    /// Pull a model through the service binary, blocking until done.
    async fn pull(&self, binary: &Path, model: &str) -> ServerResult<()>;

    /// Run one generation with an explicit model.
    async fn generate(&self, model: &str, request: &GenerateRequest) -> ServerResult<String>;
}

/// Backend for a real local Ollama installation.
#[derive(Debug, Clone)]
pub struct OllamaBackend {
    client: OllamaClient,
    plan: InstallPlan,
}

impl OllamaBackend {
    /// Backend using the platform's install plan.
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            client: OllamaClient::new(config),
            plan: InstallPlan::for_current_platform(),
        }
    }

    /// Override the install plan.
    pub fn with_plan(mut self, plan: InstallPlan) -> Self {
        self.plan = plan;
        self
    }

    fn config(&self) -> &ServiceConfig {
        self.client.config()
    }
}

#[async_trait]
impl ServiceBackend for OllamaBackend {
    async fn is_online(&self) -> bool {
        self.client.is_online().await
    }

    async fn installed_models(&self) -> ServerResult<Vec<String>> {
        self.client.list_models().await
    }

    async fn locate(&self) -> Option<PathBuf> {
        install::locate(self.config().binary.as_deref())
    }

    async fn download_installer(&self) -> ServerResult<PathBuf> {
        let dir = std::env::temp_dir().join("storyreel-installer");
        install::download(&self.plan, &dir, self.config().install_timeout()).await
    }

    async fn install(&self, artifact: &Path) -> ServerResult<()> {
        install::install(&self.plan, artifact, self.config().install_timeout()).await
    }

    #[instrument(skip(self), fields(binary = %binary.display()))]
    async fn start(&self, binary: &Path) -> ServerResult<()> {
        let child = Command::new(binary)
            .arg("serve")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                ServerError::new(ServerErrorKind::Process(format!(
                    "spawn {} serve: {}",
                    binary.display(),
                    e
                )))
            })?;
        // Detached: the service outlives this handle.
        info!(pid = child.id(), "Service process launched");
        Ok(())
    }

    #[instrument(skip(self), fields(binary = %binary.display()))]
    async fn pull(&self, binary: &Path, model: &str) -> ServerResult<()> {
        let timeout = self.config().pull_timeout();
        let mut cmd = Command::new(binary);
        cmd.args(["pull", model])
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(timeout, cmd.output())
            .await
            .map_err(|_| {
                ServerError::new(ServerErrorKind::Timeout {
                    operation: format!("pull {}", model),
                    seconds: timeout.as_secs(),
                })
            })?
            .map_err(|e| ServerError::new(ServerErrorKind::Process(format!("pull: {}", e))))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ServerError::new(ServerErrorKind::Process(format!(
                "pull {} exited with {}: {}",
                model,
                output.status,
                stderr.trim()
            ))));
        }
        debug!("Model pulled");
        Ok(())
    }

    async fn generate(&self, model: &str, request: &GenerateRequest) -> ServerResult<String> {
        self.client.generate(model, request).await
    }
}
