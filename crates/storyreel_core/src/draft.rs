//! Pipeline output records.

use serde::{Deserialize, Serialize};

/// One generated shot before it becomes part of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotDraft {
    /// Original story beat
    pub beat: String,
    /// Short 3-6 word title
    pub label: String,
    /// Prompt for the image target
    pub image_prompt: String,
    /// Prompt for the video target
    pub video_prompt: String,
}

impl ShotDraft {
    /// A draft whose prompts are the beat itself.
    pub fn unrefined(beat: impl Into<String>, label: impl Into<String>) -> Self {
        let beat = beat.into();
        Self {
            image_prompt: beat.clone(),
            video_prompt: beat.clone(),
            beat,
            label: label.into(),
        }
    }
}

/// Refined prompt pair for one shot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinedPrompt {
    /// Prompt adapted to the image target
    pub image_prompt: String,
    /// Prompt adapted to the video target
    pub video_prompt: String,
}
