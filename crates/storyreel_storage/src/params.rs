//! Pure helpers that turn a shot into renderer parameters.

use serde_json::{Map, Value, json};
use storyreel_core::{RenderPhase, Shot, Vibe};

/// Frame rate assumed when the caller does not choose one.
pub const DEFAULT_FPS: u32 = 24;

/// Shortest clip a frame-snapped model accepts.
pub const MIN_SNAPPED_FRAMES: u32 = 17;

/// Whether a video model needs `8n+1` frame counts.
pub fn is_frame_snapped_family(model_id: &str) -> bool {
    model_id.to_lowercase().starts_with("ltx")
}

/// Convert a duration to a frame count.
///
/// Plain families get `round(seconds * fps)`, at least 1. Snapped families
/// get the next `8n+1` at or above that, at least 17.
///
/// # Examples
///
/// ```
/// use storyreel_storage::duration_to_frame_count;
///
/// assert_eq!(duration_to_frame_count(5.0, 24, false), 120);
/// assert_eq!(duration_to_frame_count(5.0, 24, true), 121);
/// assert_eq!(duration_to_frame_count(0.1, 24, true), 17);
/// ```
pub fn duration_to_frame_count(seconds: f64, fps: u32, snapped: bool) -> u32 {
    let product = (seconds * f64::from(fps)).round();
    let raw = if product.is_finite() && product >= 1.0 {
        product.min(f64::from(u32::MAX)) as u64
    } else {
        1
    };

    if !snapped {
        return raw as u32;
    }

    let n = (raw.saturating_sub(1)).div_ceil(8);
    let frames = (n * 8 + 1).max(u64::from(MIN_SNAPPED_FRAMES));
    frames.min(u64::from(u32::MAX)) as u32
}

/// Renderer parameters for one shot's video, at [`DEFAULT_FPS`].
///
/// `defaults` come first and are overridden by the computed keys:
/// `model_type`, `base_model_type`, `prompt`, `video_length`, `resolution`,
/// `seed`, and `image_start` when the reference image still exists.
pub fn build_render_parameters(
    shot: &Shot,
    model_id: &str,
    duration: f64,
    vibe: Vibe,
    defaults: &Map<String, Value>,
) -> Map<String, Value> {
    build_render_parameters_at(shot, model_id, duration, vibe, defaults, DEFAULT_FPS)
}

/// [`build_render_parameters`] with an explicit frame rate.
pub fn build_render_parameters_at(
    shot: &Shot,
    model_id: &str,
    duration: f64,
    vibe: Vibe,
    defaults: &Map<String, Value>,
    fps: u32,
) -> Map<String, Value> {
    let frames = duration_to_frame_count(duration, fps, is_frame_snapped_family(model_id));

    let mut params = defaults.clone();
    params.insert("model_type".into(), json!(model_id));
    params.insert("base_model_type".into(), json!(model_id));
    params.insert("prompt".into(), json!(shot.prompt_for(RenderPhase::Video)));
    params.insert("video_length".into(), json!(frames));
    params.insert("resolution".into(), json!(vibe.resolution()));
    params.insert("seed".into(), json!(shot.seed));

    if let Some(reference) = shot.reference_image_path.as_deref().filter(|p| p.exists()) {
        params.insert("image_start".into(), json!(reference.to_string_lossy()));
    }

    params
}
