//! The project aggregate persisted to disk.

use crate::{RenderPhase, Shot, ShotStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use storyreel_error::{ShotError, ShotErrorKind};

/// Genre name → relative weight. A weight of 0 excludes the genre.
pub type GenreWeights = BTreeMap<String, u32>;

/// Visual aspect-ratio family.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumIter,
    derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum Vibe {
    /// Landscape 16:9-ish
    #[default]
    #[display("cinematic")]
    Cinematic,
    /// Portrait
    #[display("vertical")]
    Vertical,
    /// 1:1
    #[display("square")]
    Square,
}

/// Output resolution class.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumIter,
    derive_more::Display,
)]
pub enum ResolutionTier {
    /// 480p class
    #[default]
    #[serde(rename = "480p")]
    #[display("480p")]
    P480,
    /// 540p class
    #[serde(rename = "540p")]
    #[display("540p")]
    P540,
    /// 720p class
    #[serde(rename = "720p")]
    #[display("720p")]
    P720,
    /// 1080p class
    #[serde(rename = "1080p")]
    #[display("1080p")]
    P1080,
}

impl Vibe {
    /// Fixed base resolution for the vibe, `WIDTHxHEIGHT`.
    pub fn resolution(self) -> &'static str {
        match self {
            Vibe::Cinematic => "832x480",
            Vibe::Vertical => "480x832",
            Vibe::Square => "624x624",
        }
    }

    /// Resolution for the vibe at a given tier.
    ///
    /// # Examples
    ///
    /// ```
    /// use storyreel_core::{ResolutionTier, Vibe};
    ///
    /// assert_eq!(Vibe::Vertical.resolution_for(ResolutionTier::P720), "720x1280");
    /// assert_eq!(Vibe::Cinematic.resolution_for(ResolutionTier::P480), Vibe::Cinematic.resolution());
    /// ```
    pub fn resolution_for(self, tier: ResolutionTier) -> &'static str {
        use ResolutionTier::*;
        match (self, tier) {
            (Vibe::Cinematic, P480) => "832x480",
            (Vibe::Cinematic, P540) => "960x544",
            (Vibe::Cinematic, P720) => "1280x720",
            (Vibe::Cinematic, P1080) => "1920x1080",
            (Vibe::Vertical, P480) => "480x832",
            (Vibe::Vertical, P540) => "544x960",
            (Vibe::Vertical, P720) => "720x1280",
            (Vibe::Vertical, P1080) => "1080x1920",
            (Vibe::Square, P480) => "624x624",
            (Vibe::Square, P540) => "768x768",
            (Vibe::Square, P720) => "1024x1024",
            (Vibe::Square, P1080) => "1080x1080",
        }
    }
}

/// A named, disk-resident creative project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectState {
    /// Directory owning the project file and artifacts; never renamed
    pub project_dir: PathBuf,
    /// Concept text the story was generated from
    pub concept: String,
    /// Requested number of shots
    pub shot_count: usize,
    /// Genre mix used for generation
    #[serde(default)]
    pub genre_weights: GenreWeights,
    /// Target image model identifier
    #[serde(default)]
    pub image_model: String,
    /// Target video model identifier
    #[serde(default)]
    pub video_model: String,
    /// Aspect-ratio family
    #[serde(default)]
    pub vibe: Vibe,
    /// Output resolution class
    #[serde(default)]
    pub resolution_tier: ResolutionTier,
    /// Seconds per shot
    pub shot_duration: f64,
    /// Character reference images
    #[serde(default)]
    pub character_images: Vec<PathBuf>,
    /// Ordered shots; index is identity
    #[serde(default)]
    pub shots: Vec<Shot>,
    /// Wizard cursor
    pub current_step: u8,
    /// Last successful save
    pub saved_at: DateTime<Utc>,
}

impl ProjectState {
    /// A project at step 1 with no shots yet.
    pub fn new(project_dir: impl Into<PathBuf>, concept: impl Into<String>) -> Self {
        Self {
            project_dir: project_dir.into(),
            concept: concept.into(),
            shot_count: 6,
            genre_weights: GenreWeights::from([("action".to_string(), 50)]),
            image_model: String::new(),
            video_model: String::new(),
            vibe: Vibe::default(),
            resolution_tier: ResolutionTier::default(),
            shot_duration: 5.0,
            character_images: Vec::new(),
            shots: Vec::new(),
            current_step: 1,
            saved_at: Utc::now(),
        }
    }

    /// Mutable access to one shot by index.
    ///
    /// # Errors
    ///
    /// Returns [`ShotErrorKind::IndexOutOfRange`] for an unknown index.
    pub fn shot_mut(&mut self, index: usize) -> Result<&mut Shot, ShotError> {
        let len = self.shots.len();
        self.shots
            .get_mut(index)
            .ok_or_else(|| ShotError::new(ShotErrorKind::IndexOutOfRange { index, len }))
    }

    /// Number of shots approved in a phase.
    pub fn approved_count(&self, phase: RenderPhase) -> usize {
        self.shots
            .iter()
            .filter(|s| s.status(phase) == ShotStatus::Approved)
            .count()
    }

    /// Whether every shot is approved in a phase.
    pub fn all_approved(&self, phase: RenderPhase) -> bool {
        !self.shots.is_empty() && self.approved_count(phase) == self.shots.len()
    }

    /// First character reference image that still exists on disk.
    pub fn character_reference(&self) -> Option<&Path> {
        self.character_images
            .iter()
            .map(PathBuf::as_path)
            .find(|p| p.exists())
    }
}
