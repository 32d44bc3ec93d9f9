//! Local inference service lifecycle for storyreel.
//!
//! Guarantees, on demand, that a local Ollama daemon is installed, running and
//! holds at least one model, without user interaction:
//!
//! ```text
//! idle → checking → (downloading → installing) → starting → pulling → ready
//!                          any step ──▶ failed:<download|install|notfound|start|pull>
//! ```
//!
//! - [`ServiceManager`] owns the shared status and the cached model choice and
//!   serializes provisioning attempts.
//! - [`ServiceBackend`] is the seam to the outside world (HTTP and processes);
//!   [`OllamaBackend`] is the real implementation.
//! - [`OllamaClient`] speaks the service's HTTP API.
//!
//! # Example
//!
//! ```rust,no_run
//! use storyreel_server::{OllamaBackend, ServiceConfig, ServiceManager};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServiceConfig::default();
//!     let manager = ServiceManager::new(OllamaBackend::new(config.clone()), config);
//!
//!     manager.ensure_ready_in_background();
//!     println!("service is {}", manager.status());
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod client;
mod config;
mod install;
mod manager;
mod preference;
mod status;

pub use backend::{OllamaBackend, ServiceBackend};
pub use client::OllamaClient;
pub use config::{DEFAULT_BASE_URL, DEFAULT_MODEL, ServiceConfig};
pub use install::{InstallPlan, binary_candidates};
pub use manager::{ReadyReport, ServiceManager, StatusReport};
pub use preference::ModelPreferenceList;
pub use status::{FailureReason, ServiceStatus};
