//! Configuration for the local inference service.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use storyreel_error::{ServerError, ServerErrorKind, ServerResult};

/// Default control endpoint.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Model pulled when the service has none, and used when nothing better is installed.
pub const DEFAULT_MODEL: &str = "qwen2.5:3b";

/// Connection and provisioning settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL of the service (e.g., "http://localhost:11434")
    pub base_url: String,
    /// Model to pull when none is installed
    pub default_model: String,
    /// Liveness probe budget
    pub probe_timeout_secs: u64,
    /// Generation call budget
    pub generation_timeout_secs: u64,
    /// How long to wait for a freshly started service to answer
    pub start_timeout_secs: u64,
    /// Interval between liveness polls while starting
    pub start_poll_interval_ms: u64,
    /// Installer run budget
    pub install_timeout_secs: u64,
    /// Model pull budget
    pub pull_timeout_secs: u64,
    /// Explicit service binary, checked before any probing
    pub binary: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            probe_timeout_secs: 5,
            generation_timeout_secs: 120,
            start_timeout_secs: 30,
            start_poll_interval_ms: 1000,
            install_timeout_secs: 300,
            pull_timeout_secs: 600,
            binary: None,
        }
    }
}

impl ServiceConfig {
    /// Create config from environment variables.
    ///
    /// Reads:
    /// - `STORYREEL_SERVICE_URL` (default: "http://localhost:11434")
    /// - `STORYREEL_SERVICE_MODEL` (default: "qwen2.5:3b")
    /// - `STORYREEL_SERVICE_BINARY` (optional)
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not an http(s) URL.
    pub fn from_env() -> ServerResult<Self> {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("STORYREEL_SERVICE_URL") {
            config.base_url = url;
        }
        if let Ok(model) = std::env::var("STORYREEL_SERVICE_MODEL") {
            config.default_model = model;
        }
        config.binary = std::env::var_os("STORYREEL_SERVICE_BINARY").map(PathBuf::from);
        config.validate()?;
        Ok(config)
    }

    /// Check that the settings are usable.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a non-http base URL or an empty model.
    pub fn validate(&self) -> ServerResult<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ServerError::new(ServerErrorKind::Configuration(format!(
                "base_url must be http(s): {}",
                self.base_url
            ))));
        }
        if self.default_model.trim().is_empty() {
            return Err(ServerError::new(ServerErrorKind::Configuration(
                "default_model is empty".into(),
            )));
        }
        Ok(())
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the default model.
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Liveness probe budget.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Generation call budget.
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }

    /// Start-up wait budget.
    pub fn start_timeout(&self) -> Duration {
        Duration::from_secs(self.start_timeout_secs)
    }

    /// Liveness poll interval while starting.
    pub fn start_poll_interval(&self) -> Duration {
        Duration::from_millis(self.start_poll_interval_ms.max(1))
    }

    /// Installer budget.
    pub fn install_timeout(&self) -> Duration {
        Duration::from_secs(self.install_timeout_secs)
    }

    /// Model pull budget.
    pub fn pull_timeout(&self) -> Duration {
        Duration::from_secs(self.pull_timeout_secs)
    }
}
