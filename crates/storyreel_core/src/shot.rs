//! Shots and their render lifecycle.
//!
//! Each shot carries two independent status machines over the same value set,
//! one for the image phase and one for the video phase:
//!
//! ```text
//! pending ──start──▶ rendering ──succeed──▶ ready ──approve──▶ approved
//!    ▲                   │                    │
//!    └──────fail─────────┘                    └──reject──▶ rejected ──start──▶ rendering
//! ```
//!
//! With auto-approve, a successful render lands directly on `approved`.

use crate::ShotDraft;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use storyreel_error::{ShotError, ShotErrorKind};
use tracing::debug;

/// Seed value that asks the renderer for a random seed.
pub const RANDOM_SEED: i64 = -1;

/// Status of one render phase of a shot.
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
pub enum ShotStatus {
    /// Waiting to be rendered
    #[default]
    #[display("pending")]
    Pending,
    /// A render attempt is in flight
    #[display("rendering")]
    Rendering,
    /// Artifact produced, awaiting review
    #[display("ready")]
    Ready,
    /// Accepted by the reviewer
    #[display("approved")]
    Approved,
    /// Rejected by the reviewer; may be re-queued
    #[display("rejected")]
    Rejected,
}

/// Something that happens to a shot phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum ShotEvent {
    /// A render attempt begins
    #[display("start rendering")]
    StartRender,
    /// The renderer produced an artifact
    #[display("complete")]
    RenderSucceeded {
        /// Skip review and approve immediately
        auto_approve: bool,
    },
    /// The renderer failed or produced nothing
    #[display("fail")]
    RenderFailed,
    /// Reviewer accepted the artifact
    #[display("approve")]
    Approve,
    /// Reviewer rejected the artifact
    #[display("reject")]
    Reject,
}

impl ShotStatus {
    /// Apply an event, returning the next status.
    ///
    /// # Errors
    ///
    /// Returns [`ShotErrorKind::InvalidTransition`] when the event is not an
    /// edge out of the current status.
    ///
    /// # Examples
    ///
    /// ```
    /// use storyreel_core::{ShotEvent, ShotStatus};
    ///
    /// let next = ShotStatus::Pending.apply(ShotEvent::StartRender).unwrap();
    /// assert_eq!(next, ShotStatus::Rendering);
    /// assert!(ShotStatus::Approved.apply(ShotEvent::StartRender).is_err());
    /// ```
    pub fn apply(self, event: ShotEvent) -> Result<ShotStatus, ShotError> {
        use ShotEvent::*;
        use ShotStatus::*;

        let next = match (self, event) {
            (Pending | Rejected, StartRender) => Rendering,
            (Rendering, RenderSucceeded { auto_approve: true }) => Approved,
            (Rendering, RenderSucceeded { auto_approve: false }) => Ready,
            (Rendering, RenderFailed) => Pending,
            (Ready, Approve) => Approved,
            (Ready, Reject) => Rejected,
            (from, event) => {
                return Err(ShotError::new(ShotErrorKind::InvalidTransition {
                    from: from.to_string(),
                    event: event.to_string(),
                }));
            }
        };
        Ok(next)
    }

    /// Whether a render pass should pick this shot up.
    pub fn is_renderable(self) -> bool {
        matches!(self, ShotStatus::Pending | ShotStatus::Rejected)
    }
}

/// Which of a shot's two status machines is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum RenderPhase {
    /// Still image (storyboard frame)
    #[display("image")]
    Image,
    /// Video clip
    #[display("video")]
    Video,
}

/// The unit of generative work.
///
/// A shot's index within its project is its identity; shots are replaced in
/// place, never reordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shot {
    /// Original story beat, immutable once generated
    pub beat: String,
    /// Refined image prompt
    #[serde(default)]
    pub image_prompt: String,
    /// Refined video prompt
    #[serde(default)]
    pub video_prompt: String,
    /// Reference image (rendered frame or uploaded character); not owned
    #[serde(default)]
    pub reference_image_path: Option<PathBuf>,
    /// Render seed; [`RANDOM_SEED`] means unspecified
    #[serde(default = "random_seed")]
    pub seed: i64,
    /// Image-phase status
    #[serde(default)]
    pub status: ShotStatus,
    /// Video-phase status
    #[serde(default)]
    pub video_status: ShotStatus,
    /// Rendered video artifact
    #[serde(default)]
    pub video_path: Option<PathBuf>,
    /// Prompt actually sent for the last video render
    #[serde(default)]
    pub video_prompt_used: Option<String>,
}

fn random_seed() -> i64 {
    RANDOM_SEED
}

impl Shot {
    /// A fresh pending shot whose prompts equal its beat.
    pub fn new(beat: impl Into<String>) -> Self {
        let beat = beat.into();
        Self {
            image_prompt: beat.clone(),
            video_prompt: beat.clone(),
            beat,
            reference_image_path: None,
            seed: RANDOM_SEED,
            status: ShotStatus::Pending,
            video_status: ShotStatus::Pending,
            video_path: None,
            video_prompt_used: None,
        }
    }

    /// Status of the given phase.
    pub fn status(&self, phase: RenderPhase) -> ShotStatus {
        match phase {
            RenderPhase::Image => self.status,
            RenderPhase::Video => self.video_status,
        }
    }

    /// Advance one phase's status machine.
    ///
    /// # Errors
    ///
    /// Leaves the shot untouched and returns an error for an invalid edge.
    pub fn apply(&mut self, phase: RenderPhase, event: ShotEvent) -> Result<ShotStatus, ShotError> {
        let slot = match phase {
            RenderPhase::Image => &mut self.status,
            RenderPhase::Video => &mut self.video_status,
        };
        let next = slot.apply(event)?;
        debug!(%phase, from = %slot, to = %next, "Shot status transition");
        *slot = next;
        Ok(next)
    }

    /// Prompt to render for a phase: the refined prompt, else the beat.
    pub fn prompt_for(&self, phase: RenderPhase) -> &str {
        let refined = match phase {
            RenderPhase::Image => &self.image_prompt,
            RenderPhase::Video => &self.video_prompt,
        };
        if refined.trim().is_empty() {
            &self.beat
        } else {
            refined
        }
    }
}

impl From<ShotDraft> for Shot {
    fn from(draft: ShotDraft) -> Self {
        Self {
            image_prompt: draft.image_prompt,
            video_prompt: draft.video_prompt,
            ..Shot::new(draft.beat)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_happy_path_with_review() {
        let mut status = ShotStatus::Pending;
        status = status.apply(ShotEvent::StartRender).unwrap();
        status = status
            .apply(ShotEvent::RenderSucceeded { auto_approve: false })
            .unwrap();
        assert_eq!(status, ShotStatus::Ready);
        assert_eq!(status.apply(ShotEvent::Approve).unwrap(), ShotStatus::Approved);
    }

    #[test]
    fn test_auto_approve_short_circuits_review() {
        let status = ShotStatus::Rendering
            .apply(ShotEvent::RenderSucceeded { auto_approve: true })
            .unwrap();
        assert_eq!(status, ShotStatus::Approved);
    }

    #[test]
    fn test_failed_render_returns_to_pending() {
        assert_eq!(
            ShotStatus::Rendering.apply(ShotEvent::RenderFailed).unwrap(),
            ShotStatus::Pending
        );
    }

    #[test]
    fn test_rejected_shot_can_be_requeued() {
        let status = ShotStatus::Ready.apply(ShotEvent::Reject).unwrap();
        assert_eq!(status, ShotStatus::Rejected);
        assert!(status.is_renderable());
        assert_eq!(
            status.apply(ShotEvent::StartRender).unwrap(),
            ShotStatus::Rendering
        );
    }

    #[test]
    fn test_approved_is_stable() {
        let events = [
            ShotEvent::StartRender,
            ShotEvent::RenderSucceeded { auto_approve: false },
            ShotEvent::RenderFailed,
            ShotEvent::Approve,
            ShotEvent::Reject,
        ];
        for event in events {
            assert!(ShotStatus::Approved.apply(event).is_err(), "{event}");
        }
    }

    #[test]
    fn test_only_pending_and_rejected_are_renderable() {
        let renderable: Vec<_> = ShotStatus::iter().filter(|s| s.is_renderable()).collect();
        assert_eq!(renderable, vec![ShotStatus::Pending, ShotStatus::Rejected]);
    }

    #[test]
    fn test_phases_are_independent() {
        let mut shot = Shot::new("a lighthouse at dusk");
        shot.apply(RenderPhase::Image, ShotEvent::StartRender).unwrap();
        assert_eq!(shot.status(RenderPhase::Image), ShotStatus::Rendering);
        assert_eq!(shot.status(RenderPhase::Video), ShotStatus::Pending);
    }

    #[test]
    fn test_invalid_transition_leaves_shot_untouched() {
        let mut shot = Shot::new("beat");
        let err = shot.apply(RenderPhase::Video, ShotEvent::Approve).unwrap_err();
        assert!(matches!(err.kind, ShotErrorKind::InvalidTransition { .. }));
        assert_eq!(shot.video_status, ShotStatus::Pending);
    }

    #[test]
    fn test_prompt_falls_back_to_beat() {
        let mut shot = Shot::new("the beat");
        shot.video_prompt.clear();
        shot.image_prompt = "refined still".into();
        assert_eq!(shot.prompt_for(RenderPhase::Video), "the beat");
        assert_eq!(shot.prompt_for(RenderPhase::Image), "refined still");
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&ShotStatus::Approved).unwrap();
        assert_eq!(json, "\"approved\"");
    }
}
