//! Shot-by-shot render orchestration.
//!
//! A render pass walks a project's shots in index order and renders every
//! shot whose phase status is `pending` or `rejected`:
//!
//! 1. refine the prompt for the target model
//! 2. mark the shot `rendering` and save
//! 3. run the task and pick up the newest artifact written since it started
//! 4. copy the artifact into the project
//! 5. mark the shot `ready` (or `approved`) on success, `pending` otherwise, and save

use crate::{RenderConfig, RenderTask, Renderer, find_newest_output, output_extensions};
use derive_getters::Getters;
use rand::Rng;
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::time::SystemTime;
use storyreel_core::{InferenceDriver, ProjectState, RenderPhase, Shot, ShotEvent, ShotStatus};
use storyreel_error::{NarrativeError, NarrativeErrorKind, StoryreelResult};
use storyreel_narrative::{ContentPipeline, PromptPurpose};
use storyreel_storage::{IMAGES_DIR, ProjectStore, VIDEOS_DIR, build_render_parameters_at};
use tracing::{debug, info, instrument, warn};

/// Upper bound (exclusive) for seeds drawn when a shot is rejected.
pub const RESEED_RANGE: i64 = 1_000_000;

/// Outcome of one render pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Getters)]
pub struct RenderSummary {
    /// Shots a render was attempted for
    attempted: usize,
    /// Shots that produced an artifact
    rendered: usize,
}

/// Drives storyboarding and rendering for projects.
pub struct ShotDriver<D, R> {
    pipeline: ContentPipeline<D>,
    renderer: R,
    store: ProjectStore,
    settings: RenderConfig,
}

impl<D: InferenceDriver, R: Renderer> ShotDriver<D, R> {
    /// Driver over a pipeline, a renderer and a project store.
    pub fn new(
        pipeline: ContentPipeline<D>,
        renderer: R,
        store: ProjectStore,
        settings: RenderConfig,
    ) -> Self {
        Self {
            pipeline,
            renderer,
            store,
            settings,
        }
    }

    /// The content pipeline.
    pub fn pipeline(&self) -> &ContentPipeline<D> {
        &self.pipeline
    }

    /// The renderer.
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// The project store.
    pub fn store(&self) -> &ProjectStore {
        &self.store
    }

    /// Replace the project's shots with freshly generated ones and save.
    #[instrument(skip(self, project), fields(project = %project.project_dir.display()))]
    pub async fn storyboard(&self, project: &mut ProjectState) -> usize {
        let drafts = self
            .pipeline
            .generate_shots(
                &project.concept,
                project.shot_count,
                &project.genre_weights,
                &project.image_model,
                &project.video_model,
            )
            .await;
        project.shot_count = drafts.len();
        project.shots = drafts.into_iter().map(Shot::from).collect();
        self.store.save_project(project);
        info!(shots = project.shots.len(), "Storyboard ready");
        project.shots.len()
    }

    /// Render still frames for every pending or rejected shot.
    ///
    /// # Errors
    ///
    /// Returns [`NarrativeErrorKind::MissingModel`] when the project has no
    /// image model. Render failures are not errors; they leave the shot
    /// `pending`.
    #[instrument(skip(self, project), fields(project = %project.project_dir.display()))]
    pub async fn render_images(&self, project: &mut ProjectState) -> StoryreelResult<RenderSummary> {
        let model = required_model(&project.image_model, RenderPhase::Image)?;
        let defaults = self.renderer.default_settings(&model);
        let resolution = project.vibe.resolution_for(self.settings.resolution_tier);
        let character = project.character_reference().map(|p| p.to_path_buf());

        let mut summary = RenderSummary::default();
        for index in renderable(project, RenderPhase::Image) {
            let raw = project.shots[index].prompt_for(RenderPhase::Image).to_string();
            let prompt = self
                .pipeline
                .refine_single(&raw, &model, PromptPurpose::Image)
                .await;

            let mut params = defaults.clone();
            params.insert("resolution".into(), json!(resolution));
            params.insert("image_mode".into(), json!(1));
            params.insert("seed".into(), json!(project.shots[index].seed));
            if let Some(reference) = &character {
                params.insert("image_start".into(), json!(reference.to_string_lossy()));
            }
            let task = RenderTask::new(&prompt, &model, params);

            summary.attempted += 1;
            if self.render_shot(project, index, RenderPhase::Image, &task).await? {
                summary.rendered += 1;
            }
        }

        info!(attempted = summary.attempted, rendered = summary.rendered, "Image pass finished");
        Ok(summary)
    }

    /// Render clips for every pending or rejected shot.
    ///
    /// Uses each shot's rendered still as the first frame when it exists.
    ///
    /// # Errors
    ///
    /// Returns [`NarrativeErrorKind::MissingModel`] when the project has no
    /// video model.
    #[instrument(skip(self, project), fields(project = %project.project_dir.display()))]
    pub async fn render_videos(&self, project: &mut ProjectState) -> StoryreelResult<RenderSummary> {
        let model = required_model(&project.video_model, RenderPhase::Video)?;
        let defaults = self.renderer.default_settings(&model);
        let resolution = project.vibe.resolution_for(self.settings.resolution_tier);

        let mut summary = RenderSummary::default();
        for index in renderable(project, RenderPhase::Video) {
            let raw = project.shots[index].prompt_for(RenderPhase::Video).to_string();
            let prompt = self
                .pipeline
                .refine_single(&raw, &model, PromptPurpose::Video)
                .await;

            let refined = Shot {
                video_prompt: prompt.clone(),
                ..project.shots[index].clone()
            };
            let mut params = build_render_parameters_at(
                &refined,
                &model,
                project.shot_duration,
                project.vibe,
                &defaults,
                self.settings.fps,
            );
            params.insert("resolution".into(), json!(resolution));
            let task = RenderTask::new(&prompt, &model, params);

            project.shots[index].video_prompt_used = Some(prompt);
            summary.attempted += 1;
            if self.render_shot(project, index, RenderPhase::Video, &task).await? {
                summary.rendered += 1;
            }
        }

        info!(attempted = summary.attempted, rendered = summary.rendered, "Video pass finished");
        Ok(summary)
    }

    /// Accept a rendered shot and save.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown index or a shot that is not `ready`.
    #[instrument(skip(self, project))]
    pub fn approve(
        &self,
        project: &mut ProjectState,
        index: usize,
        phase: RenderPhase,
    ) -> StoryreelResult<ShotStatus> {
        let status = project.shot_mut(index)?.apply(phase, ShotEvent::Approve)?;
        self.store.save_project(project);
        Ok(status)
    }

    /// Reject a rendered shot and save. A rejected still gets a new seed so
    /// the next render differs.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown index or a shot that is not `ready`.
    #[instrument(skip(self, project))]
    pub fn reject(
        &self,
        project: &mut ProjectState,
        index: usize,
        phase: RenderPhase,
    ) -> StoryreelResult<ShotStatus> {
        let shot = project.shot_mut(index)?;
        let status = shot.apply(phase, ShotEvent::Reject)?;
        if phase == RenderPhase::Image {
            shot.seed = rand::thread_rng().gen_range(0..RESEED_RANGE);
            debug!(seed = shot.seed, "Reseeded rejected shot");
        }
        self.store.save_project(project);
        Ok(status)
    }

    async fn render_shot(
        &self,
        project: &mut ProjectState,
        index: usize,
        phase: RenderPhase,
        task: &RenderTask,
    ) -> StoryreelResult<bool> {
        project.shots[index].apply(phase, ShotEvent::StartRender)?;
        self.store.save_project(project);

        let started = SystemTime::now();
        let artifact = match self.renderer.run(task).await {
            Ok(()) => self.collect_artifact(project, phase, started),
            Err(e) => {
                warn!(shot = index, %phase, error = %e, "Render failed");
                None
            }
        };

        let shot = &mut project.shots[index];
        let event = match &artifact {
            Some(path) => {
                match phase {
                    RenderPhase::Image => shot.reference_image_path = Some(path.clone()),
                    RenderPhase::Video => shot.video_path = Some(path.clone()),
                }
                ShotEvent::RenderSucceeded {
                    auto_approve: self.settings.auto_approve,
                }
            }
            None => ShotEvent::RenderFailed,
        };
        let status = shot.apply(phase, event)?;
        self.store.save_project(project);
        info!(shot = index, %phase, %status, artifact = ?artifact, "Shot rendered");
        Ok(artifact.is_some())
    }

    fn collect_artifact(
        &self,
        project: &ProjectState,
        phase: RenderPhase,
        started: SystemTime,
    ) -> Option<PathBuf> {
        let output_dir = self.renderer.output_dir(phase);
        let Some(output) = find_newest_output(&output_dir, output_extensions(phase), started) else {
            warn!(%phase, dir = %output_dir.display(), "Renderer reported success but wrote nothing");
            return None;
        };

        let subfolder = match phase {
            RenderPhase::Image => IMAGES_DIR,
            RenderPhase::Video => VIDEOS_DIR,
        };
        match self
            .store
            .copy_into_project(&output, &project.project_dir, subfolder)
        {
            Ok(copied) => Some(copied),
            Err(e) => {
                warn!(error = %e, "Could not copy artifact into project; keeping renderer path");
                Some(output)
            }
        }
    }
}

fn required_model(model: &str, phase: RenderPhase) -> StoryreelResult<String> {
    if model.trim().is_empty() {
        return Err(NarrativeError::new(NarrativeErrorKind::MissingModel(phase.to_string())).into());
    }
    Ok(model.to_string())
}

/// Indices of shots a pass should render, in order.
fn renderable(project: &ProjectState, phase: RenderPhase) -> Vec<usize> {
    project
        .shots
        .iter()
        .enumerate()
        .filter(|(_, shot)| {
            shot.status(phase).is_renderable() && !shot.prompt_for(phase).trim().is_empty()
        })
        .map(|(index, _)| index)
        .collect()
}
