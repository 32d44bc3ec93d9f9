//! Storyreel: a local-first storyboard pipeline.
//!
//! A concept becomes a list of shots, each shot becomes a still and then a
//! clip, and every step is saved to a project directory so work survives a
//! restart. Text comes from a local inference service that this crate can
//! install and start on demand; stills and clips come from any engine that
//! implements [`Renderer`].
//!
//! # Example
//!
//! ```no_run
//! use storyreel::{
//!     ContentPipeline, OllamaBackend, ProjectStore, ServiceManager, StoryreelConfig,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StoryreelConfig::load()?;
//! let backend = OllamaBackend::new(config.service.clone());
//! let service = ServiceManager::new(backend, config.service.clone());
//! service.ensure_ready_in_background();
//!
//! let store = ProjectStore::new(config.projects.resolved_base_dir());
//! let dir = store.create_project("a lighthouse keeper")?;
//!
//! let pipeline = ContentPipeline::new(service);
//! let shots = pipeline
//!     .generate_shots("a lighthouse keeper", 6, &Default::default(), "", "")
//!     .await;
//! println!("{} shots in {}", shots.len(), dir.display());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod driver;
mod render;

pub use config::{ProjectsConfig, RenderConfig, StoryreelConfig};
pub use driver::{RESEED_RANGE, RenderSummary, ShotDriver};
pub use render::{
    IMAGE_EXTENSIONS, RenderTask, Renderer, VIDEO_EXTENSIONS, find_newest_output,
    output_extensions,
};

pub use storyreel_core::*;
pub use storyreel_error::*;
pub use storyreel_narrative::*;
pub use storyreel_server::*;
pub use storyreel_storage::*;
