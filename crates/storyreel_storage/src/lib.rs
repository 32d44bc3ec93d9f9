//! Durable project storage for storyreel.
//!
//! [`ProjectStore`] creates project directories, saves and loads
//! `project.json` atomically, lists recent projects and copies rendered
//! artifacts in. The free functions turn a [`Shot`](storyreel_core::Shot)
//! into renderer parameters without touching the disk, except to check that a
//! reference image still exists.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod params;
mod slug;
mod store;

pub use params::{
    DEFAULT_FPS, MIN_SNAPPED_FRAMES, build_render_parameters, build_render_parameters_at,
    duration_to_frame_count, is_frame_snapped_family,
};
pub use slug::{DEFAULT_SLUG, MAX_SLUG_LEN, slugify};
pub use store::{
    AgeBucket, CHARACTERS_DIR, IMAGES_DIR, PROJECT_FILE, ProjectStore, ProjectSummary,
    VIDEOS_DIR,
};
