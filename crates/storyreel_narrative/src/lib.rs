//! Story beat generation and per-model prompt refinement.
//!
//! [`ContentPipeline`] turns a concept into shot drafts using any
//! [`InferenceDriver`](storyreel_core::InferenceDriver), degrading to built-in
//! story templates when the model is unreachable or answers badly, and adapts
//! prompts to target image/video models using the static guide registry.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod extraction;
mod guides;
mod pipeline;
mod templates;

pub use extraction::parse_structured_array;
pub use guides::{PromptGuide, format_guide, guide_for};
pub use pipeline::{ContentPipeline, MAX_SHOTS, MIN_SHOTS, PromptPurpose, clamp_shot_count};
pub use templates::{PLACEHOLDER_SUBJECT, StoryTemplate, sample_template, templates};
