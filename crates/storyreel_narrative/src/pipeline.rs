//! Shot generation and prompt refinement against a local model.

use crate::extraction::{parse_structured_array, unwrap_text};
use crate::guides::format_guide;
use crate::templates::sample_template;
use base64::Engine;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::Value;
use std::path::Path;
use std::sync::Mutex;
use storyreel_core::{GenerateRequest, GenreWeights, InferenceDriver, RefinedPrompt, ShotDraft};
use storyreel_error::{NarrativeError, NarrativeErrorKind, NarrativeResult};
use tracing::{debug, info, instrument, warn};

/// Smallest supported shot count.
pub const MIN_SHOTS: usize = 2;
/// Largest supported shot count.
pub const MAX_SHOTS: usize = 20;

const BEAT_TEMPERATURE: f32 = 0.9;
const REFINE_TEMPERATURE: f32 = 0.4;
const BATCH_MAX_TOKENS: u32 = 4096;
const SINGLE_MAX_TOKENS: u32 = 1024;
const DESCRIBE_MAX_TOKENS: u32 = 512;
const MIN_REFINED_CHARS: usize = 10;

/// Clamp a requested shot count into `MIN_SHOTS..=MAX_SHOTS`.
pub fn clamp_shot_count(requested: usize) -> usize {
    requested.clamp(MIN_SHOTS, MAX_SHOTS)
}

/// Which render target a single prompt is being adapted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum PromptPurpose {
    /// Still image
    #[display("image")]
    Image,
    /// Video clip
    #[display("video")]
    Video,
}

/// Produces shot drafts and adapts prompts to target models.
///
/// Every public operation degrades instead of failing: an unreachable service
/// or a malformed answer yields template beats or the unrefined text.
pub struct ContentPipeline<D> {
    driver: D,
    rng: Mutex<StdRng>,
}

impl<D: InferenceDriver> ContentPipeline<D> {
    /// Pipeline with an entropy-seeded offline sampler.
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Pipeline whose offline path is reproducible.
    pub fn with_seed(driver: D, seed: u64) -> Self {
        Self {
            driver,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// The inference driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Produce `shot_count` (clamped to 2..=20) shot drafts for a concept.
    ///
    /// Asks the model for beats when the service is online, falling back to a
    /// story template otherwise or when the answer is unusable. Model-made
    /// beats are then refined for the target models when any is given.
    #[instrument(skip(self, concept, weights), fields(concept_len = concept.len()))]
    pub async fn generate_shots(
        &self,
        concept: &str,
        shot_count: usize,
        weights: &GenreWeights,
        image_model: &str,
        video_model: &str,
    ) -> Vec<ShotDraft> {
        let count = clamp_shot_count(shot_count);
        if count != shot_count {
            debug!(requested = shot_count, count, "Clamped shot count");
        }
        let weights = effective_weights(weights);

        if !self.driver.is_online().await {
            info!("Inference service offline; using story templates");
            return self.offline_shots(concept, count, &weights);
        }

        let drafts = match self.generate_beats(concept, count, &weights).await {
            Ok(drafts) => drafts,
            Err(e) => {
                warn!(error = %e, "Beat generation unusable; using story templates");
                return self.offline_shots(concept, count, &weights);
            }
        };

        if image_model.is_empty() && video_model.is_empty() {
            return drafts;
        }

        match self.refine_batch(&drafts, image_model, video_model).await {
            Some(refined) => drafts
                .into_iter()
                .zip(refined)
                .map(|(draft, prompts)| ShotDraft {
                    image_prompt: prompts.image_prompt,
                    video_prompt: prompts.video_prompt,
                    ..draft
                })
                .collect(),
            None => drafts,
        }
    }

    /// Template beats for a concept, with prompts equal to the beats.
    pub fn offline_shots(&self, concept: &str, count: usize, weights: &GenreWeights) -> Vec<ShotDraft> {
        let template = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            sample_template(weights, &mut *rng)
        };
        template
            .fill(concept, count)
            .into_iter()
            .enumerate()
            .map(|(i, beat)| ShotDraft::unrefined(beat, default_label(i)))
            .collect()
    }

    async fn generate_beats(
        &self,
        concept: &str,
        count: usize,
        weights: &GenreWeights,
    ) -> NarrativeResult<Vec<ShotDraft>> {
        let request = GenerateRequest::new(beat_instruction(count), story_request(concept, count, weights))
            .with_temperature(BEAT_TEMPERATURE)
            .with_max_tokens(BATCH_MAX_TOKENS);

        let raw = self
            .driver
            .generate(&request)
            .await
            .map_err(|e| NarrativeError::new(NarrativeErrorKind::Generation(e.to_string())))?;

        let rows = parse_structured_array(&raw)
            .ok_or_else(|| NarrativeError::new(NarrativeErrorKind::NoStructuredArray(raw.len())))?;

        let drafts = drafts_from_rows(&rows, count)?;
        info!(count = drafts.len(), "Generated story beats");
        Ok(drafts)
    }

    /// Adapt every draft's beat to the image and video target models.
    ///
    /// Returns `None` when neither model has a guide, the call fails, or the
    /// answer does not hold exactly one row per draft. A field whose model has
    /// no guide keeps the original beat.
    #[instrument(skip(self, drafts), fields(count = drafts.len()))]
    pub async fn refine_batch(
        &self,
        drafts: &[ShotDraft],
        image_model: &str,
        video_model: &str,
    ) -> Option<Vec<RefinedPrompt>> {
        let image_guide = format_guide(image_model);
        let video_guide = format_guide(video_model);
        if image_guide.is_none() && video_guide.is_none() {
            debug!("No guide for either target; skipping refinement");
            return None;
        }

        let request = GenerateRequest::new(
            refine_instruction(drafts.len(), image_guide.as_deref(), video_guide.as_deref()),
            refine_request(drafts),
        )
        .with_temperature(REFINE_TEMPERATURE)
        .with_max_tokens(BATCH_MAX_TOKENS);

        let raw = match self.driver.generate(&request).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Refinement call failed; keeping original prompts");
                return None;
            }
        };

        let Some(rows) = parse_structured_array(&raw) else {
            warn!("Refinement answer held no array; keeping original prompts");
            return None;
        };
        if rows.len() != drafts.len() {
            let err = NarrativeError::new(NarrativeErrorKind::RowCountMismatch {
                expected: drafts.len(),
                actual: rows.len(),
            });
            warn!(error = %err, "Refinement rejected; keeping original prompts");
            return None;
        }

        let refined = drafts
            .iter()
            .zip(&rows)
            .map(|(draft, row)| RefinedPrompt {
                image_prompt: refined_field(row, "imagePrompt", image_guide.is_some(), &draft.beat),
                video_prompt: refined_field(row, "videoPrompt", video_guide.is_some(), &draft.beat),
            })
            .collect();
        info!(count = drafts.len(), "Refined shot prompts");
        Some(refined)
    }

    /// Adapt one prompt to a model just before rendering.
    ///
    /// Returns `raw` unchanged when the model has no guide, the service is
    /// offline, the call fails, or the answer is implausibly short.
    #[instrument(skip(self, raw), fields(raw_len = raw.len()))]
    pub async fn refine_single(&self, raw: &str, model_id: &str, purpose: PromptPurpose) -> String {
        let Some(guide) = format_guide(model_id) else {
            return raw.to_string();
        };
        if raw.trim().is_empty() || !self.driver.is_online().await {
            return raw.to_string();
        }

        let request = GenerateRequest::new(single_instruction(purpose, &guide), raw)
            .with_temperature(REFINE_TEMPERATURE)
            .with_max_tokens(SINGLE_MAX_TOKENS);

        match self.driver.generate(&request).await {
            Ok(answer) => {
                let cleaned = unwrap_text(&answer);
                if cleaned.chars().count() < MIN_REFINED_CHARS {
                    warn!(len = cleaned.len(), "Refined prompt too short; using original");
                    raw.to_string()
                } else {
                    debug!(len = cleaned.len(), "Prompt refined");
                    cleaned
                }
            }
            Err(e) => {
                warn!(error = %e, "Single refinement failed; using original");
                raw.to_string()
            }
        }
    }

    /// Ask the model for a one-paragraph visual description of an image.
    ///
    /// Returns `None` when the service is offline, the file cannot be read, or
    /// the model gives nothing back.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn describe_reference_image(&self, path: &Path) -> Option<String> {
        if !self.driver.is_online().await {
            return None;
        }

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Could not read reference image");
                return None;
            }
        };
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);

        let request = GenerateRequest::new(
            "You describe reference images for an image generator. Answer with one paragraph \
             covering the subject's appearance, clothing, colours, setting and lighting. \
             No preamble, no lists.",
            "Describe this image.",
        )
        .with_images(vec![encoded])
        .with_temperature(REFINE_TEMPERATURE)
        .with_max_tokens(DESCRIBE_MAX_TOKENS);

        match self.driver.generate(&request).await {
            Ok(text) => {
                let text = unwrap_text(&text);
                (!text.is_empty()).then_some(text)
            }
            Err(e) => {
                warn!(error = %e, "Image description failed");
                None
            }
        }
    }
}

fn effective_weights(weights: &GenreWeights) -> GenreWeights {
    if weights.is_empty() {
        GenreWeights::from([("action".to_string(), 50)])
    } else {
        weights.clone()
    }
}

fn default_label(index: usize) -> String {
    format!("Shot {}", index + 1)
}

/// Active genres as `name (NN%)`, heaviest first.
fn genre_mix_line(weights: &GenreWeights) -> Option<String> {
    let mut active: Vec<(&String, u32)> = weights
        .iter()
        .filter(|(_, w)| **w > 0)
        .map(|(g, w)| (g, *w))
        .collect();
    if active.is_empty() {
        return None;
    }
    active.sort_by(|a, b| b.1.cmp(&a.1));

    let total: u64 = active.iter().map(|(_, w)| u64::from(*w)).sum();
    let parts: Vec<String> = active
        .iter()
        .map(|(g, w)| format!("{} ({}%)", g, (f64::from(*w) / total as f64 * 100.0).round()))
        .collect();
    Some(parts.join(", "))
}

fn beat_instruction(count: usize) -> String {
    format!(
        "You are a storyboard assistant for a film director. Produce exactly {count} varied, \
         cinematic shots that tell the story visually.\n\n\
         Vary camera angle, action, mood and pacing from shot to shot. Mix establishing shots, \
         close-ups, action, emotional beats and transitions.\n\n\
         Respond with ONLY valid JSON: an array of exactly {count} objects shaped like\n\
         [{{\"prompt\": \"cinematic scene description\", \"shot_label\": \"short title, 3-6 words\"}}]\n\n\
         RULES:\n\
         - Each prompt stands alone and is detailed enough for a video model.\n\
         - Keep characters, setting and palette consistent across shots.\n\
         - No dialogue and no on-screen text.\n\
         - Under 100 words per prompt.\n\
         - Describe lighting, camera movement and atmosphere."
    )
}

fn story_request(concept: &str, count: usize, weights: &GenreWeights) -> String {
    let concept = concept.trim();
    let mut story = if concept.is_empty() {
        "Invent an original, surprising and visually striking short story, then break it into shots."
            .to_string()
    } else {
        format!("Subject: \"{concept}\".\nBuild a compelling short story around it, then break it into shots.")
    };
    if let Some(mix) = genre_mix_line(weights) {
        story.push_str(&format!(
            "\nGenre mix (approximate): {mix}. Lean tone and look toward the heavier genres."
        ));
    }
    format!("Create a {count}-shot storyboard:\n\n{story}")
}

fn refine_instruction(count: usize, image_guide: Option<&str>, video_guide: Option<&str>) -> String {
    let mut guides = String::new();
    if let Some(guide) = image_guide {
        guides.push_str(&format!("\n\nIMAGE MODEL GUIDE (for the 'imagePrompt' field):\n{guide}"));
    }
    if let Some(guide) = video_guide {
        guides.push_str(&format!("\n\nVIDEO MODEL GUIDE (for the 'videoPrompt' field):\n{guide}"));
    }

    format!(
        "You optimise prompts for generative models. Rewrite each prompt to follow the syntax, \
         keywords and rules of its target model.{guides}\n\n\
         Respond with ONLY valid JSON: an array of exactly {count} objects shaped like\n\
         [{{\"imagePrompt\": \"...\", \"videoPrompt\": \"...\"}}]\n\
         Rules:\n\
         - Keep the creative intent of every shot.\n\
         - Apply only the syntax rules from the guides above.\n\
         - Without an image guide, copy the original prompt into imagePrompt.\n\
         - Without a video guide, copy the original prompt into videoPrompt.\n\
         - Never add scene content; only improve the wording.\n\
         - Keep each field under 150 words."
    )
}

fn refine_request(drafts: &[ShotDraft]) -> String {
    let list: Vec<String> = drafts
        .iter()
        .enumerate()
        .map(|(i, d)| format!("{}. \"{}\"", i + 1, d.beat))
        .collect();
    format!("Refine these {} shot prompts:\n\n{}", drafts.len(), list.join("\n"))
}

fn single_instruction(purpose: PromptPurpose, guide: &str) -> String {
    format!(
        "You optimise a single {purpose} prompt for a generative model.\n\n{guide}\n\n\
         Rules:\n\
         - Keep the creative intent and every scene element.\n\
         - Never add new scene content; only improve the wording.\n\
         - Under 150 words.\n\
         - Answer with the rewritten prompt only: no quotes, no preamble."
    )
}

fn drafts_from_rows(rows: &[Value], count: usize) -> NarrativeResult<Vec<ShotDraft>> {
    let mut drafts: Vec<ShotDraft> = rows
        .iter()
        .filter_map(draft_from_row)
        .take(count)
        .collect();

    if drafts.len() < count {
        return Err(NarrativeError::new(NarrativeErrorKind::RowCountMismatch {
            expected: count,
            actual: drafts.len(),
        }));
    }

    for (i, draft) in drafts.iter_mut().enumerate() {
        if draft.label.is_empty() {
            draft.label = default_label(i);
        }
    }
    Ok(drafts)
}

fn draft_from_row(row: &Value) -> Option<ShotDraft> {
    let (beat, label) = match row {
        Value::String(beat) => (beat.as_str(), ""),
        Value::Object(_) => (
            first_str(row, &["prompt", "beat", "description"])?,
            first_str(row, &["shot_label", "label", "title"]).unwrap_or(""),
        ),
        _ => return None,
    };
    let beat = beat.trim();
    if beat.is_empty() {
        return None;
    }
    Some(ShotDraft::unrefined(beat, label.trim()))
}

fn first_str<'a>(row: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| row.get(*key).and_then(Value::as_str))
}

fn refined_field(row: &Value, key: &str, has_guide: bool, beat: &str) -> String {
    if !has_guide {
        return beat.to_string();
    }
    row.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(beat)
        .to_string()
}
