//! The external renderer seam.

use async_trait::async_trait;
use chrono::Utc;
use derive_getters::Getters;
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use storyreel_core::RenderPhase;
use storyreel_error::StoryreelResult;
use tracing::debug;

/// Extensions the renderer produces for stills.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// Extensions the renderer produces for clips.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4"];

/// Output extensions expected for a render phase.
pub fn output_extensions(phase: RenderPhase) -> &'static [&'static str] {
    match phase {
        RenderPhase::Image => IMAGE_EXTENSIONS,
        RenderPhase::Video => VIDEO_EXTENSIONS,
    }
}

/// One unit of work for the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Getters)]
pub struct RenderTask {
    /// Millisecond timestamp identifying the task
    id: i64,
    /// Full parameter set handed to the renderer
    params: Map<String, Value>,
}

impl RenderTask {
    /// Task for `prompt` on `model_id`.
    ///
    /// `params` are kept as given except for `prompt`, `model_type` and
    /// `base_model_type`, which are always set here. `mode` defaults to empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use serde_json::{Map, json};
    /// use storyreel::RenderTask;
    ///
    /// let mut params = Map::new();
    /// params.insert("prompt".into(), json!("stale"));
    /// let task = RenderTask::new("a keeper at dusk", "flux2", params);
    /// assert_eq!(task.params()["prompt"], "a keeper at dusk");
    /// assert_eq!(task.params()["base_model_type"], "flux2");
    /// ```
    pub fn new(prompt: &str, model_id: &str, mut params: Map<String, Value>) -> Self {
        params.insert("prompt".into(), json!(prompt));
        params.insert("model_type".into(), json!(model_id));
        params.insert("base_model_type".into(), json!(model_id));
        params.entry("mode").or_insert_with(|| json!(""));
        Self {
            id: Utc::now().timestamp_millis(),
            params,
        }
    }

    /// Prompt this task renders.
    pub fn prompt(&self) -> &str {
        self.params
            .get("prompt")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }
}

/// An image/video generation engine that runs one task at a time.
///
/// Implementations block until the task finishes and leave the artifact in
/// [`output_dir`](Renderer::output_dir); the driver finds it by timestamp.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Parameters the engine recommends for a model.
    fn default_settings(&self, _model_id: &str) -> Map<String, Value> {
        Map::new()
    }

    /// Run one task to completion.
    async fn run(&self, task: &RenderTask) -> StoryreelResult<()>;

    /// Directory the engine writes artifacts of a phase to.
    fn output_dir(&self, phase: RenderPhase) -> PathBuf;
}

/// Newest file in `dir` with one of `extensions` modified at or after `since`.
pub fn find_newest_output(dir: &Path, extensions: &[&str], since: SystemTime) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    let newest = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
        })
        .filter_map(|path| {
            let modified = path.metadata().and_then(|m| m.modified()).ok()?;
            (modified >= since).then_some((modified, path))
        })
        .max_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, path)| path);
    debug!(dir = %dir.display(), found = ?newest, "Looked for newest output");
    newest
}
