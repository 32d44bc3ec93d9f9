//! Core data types for storyreel.
//!
//! Shared by the lifecycle manager, the content pipeline and the project store:
//! shots and their two status machines, the project aggregate, generation
//! requests and the [`InferenceDriver`] seam.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod draft;
mod driver;
mod project;
mod request;
mod shot;
mod telemetry;

pub use draft::{RefinedPrompt, ShotDraft};
pub use driver::InferenceDriver;
pub use project::{GenreWeights, ProjectState, ResolutionTier, Vibe};
pub use request::GenerateRequest;
pub use shot::{RANDOM_SEED, RenderPhase, Shot, ShotEvent, ShotStatus};
pub use telemetry::init_telemetry;
#[cfg(feature = "otel")]
pub use telemetry::shutdown_telemetry;
