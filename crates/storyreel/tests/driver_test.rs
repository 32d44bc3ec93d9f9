//! Render passes against a scripted renderer and an offline model.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;
use storyreel::{
    CHARACTERS_DIR, ContentPipeline, GenerateRequest, IMAGES_DIR, InferenceDriver,
    ProjectState, ProjectStore, RESEED_RANGE, RenderConfig, RenderPhase, RenderTask, Renderer,
    ResolutionTier, ServerError, ServerErrorKind, Shot, ShotDriver, ShotStatus, StoryreelResult,
    VIDEOS_DIR, Vibe,
};

struct Offline;

#[async_trait]
impl InferenceDriver for Offline {
    async fn is_online(&self) -> bool {
        false
    }

    async fn generate(&self, _request: &GenerateRequest) -> StoryreelResult<String> {
        Err(ServerError::new(ServerErrorKind::Http("offline".into())).into())
    }
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Write,
    Nothing,
    Fail,
}

/// Writes one artifact per successful task into its output directory.
struct ScriptedRenderer {
    output: PathBuf,
    outcomes: Mutex<VecDeque<Outcome>>,
    tasks: Mutex<Vec<RenderTask>>,
}

impl ScriptedRenderer {
    fn new(output: &Path, outcomes: &[Outcome]) -> Self {
        for phase in ["images", "videos"] {
            std::fs::create_dir_all(output.join(phase)).unwrap();
        }
        Self {
            output: output.to_path_buf(),
            outcomes: Mutex::new(outcomes.iter().copied().collect()),
            tasks: Mutex::new(Vec::new()),
        }
    }

    fn tasks(&self) -> Vec<RenderTask> {
        self.tasks.lock().unwrap().clone()
    }
}

#[async_trait]
impl Renderer for ScriptedRenderer {
    async fn run(&self, task: &RenderTask) -> StoryreelResult<()> {
        let n = {
            let mut tasks = self.tasks.lock().unwrap();
            tasks.push(task.clone());
            tasks.len()
        };
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Outcome::Write);

        match outcome {
            Outcome::Write => {
                let (phase, ext) = if task.params().contains_key("image_mode") {
                    (RenderPhase::Image, "png")
                } else {
                    (RenderPhase::Video, "mp4")
                };
                let path = self.output_dir(phase).join(format!("render_{n}.{ext}"));
                let file = File::create(&path).unwrap();
                file.set_modified(SystemTime::now()).unwrap();
                Ok(())
            }
            Outcome::Nothing => Ok(()),
            Outcome::Fail => {
                Err(ServerError::new(ServerErrorKind::Process("renderer crashed".into())).into())
            }
        }
    }

    fn output_dir(&self, phase: RenderPhase) -> PathBuf {
        match phase {
            RenderPhase::Image => self.output.join("images"),
            RenderPhase::Video => self.output.join("videos"),
        }
    }
}

struct Fixture {
    _root: tempfile::TempDir,
    driver: ShotDriver<Offline, ScriptedRenderer>,
    project: ProjectState,
}

fn fixture(outcomes: &[Outcome], settings: RenderConfig, shots: usize) -> Fixture {
    let root = tempfile::tempdir().unwrap();
    let store = ProjectStore::new(root.path().join("projects"));
    let dir = store.create_project("a lighthouse keeper").unwrap();

    let mut project = ProjectState::new(&dir, "a lighthouse keeper");
    project.image_model = "flux2".to_string();
    project.video_model = "ltx2".to_string();
    project.vibe = Vibe::Vertical;
    project.shots = (0..shots)
        .map(|i| Shot::new(format!("the keeper climbs stair {i}")))
        .collect();
    project.shot_count = shots;

    let renderer = ScriptedRenderer::new(&root.path().join("outputs"), outcomes);
    let driver = ShotDriver::new(
        ContentPipeline::with_seed(Offline, 1),
        renderer,
        store,
        settings,
    );
    Fixture {
        _root: root,
        driver,
        project,
    }
}

#[tokio::test]
async fn test_image_pass_renders_and_persists_every_shot() {
    let mut f = fixture(&[], RenderConfig::default(), 3);

    let summary = f.driver.render_images(&mut f.project).await.unwrap();
    assert_eq!(*summary.attempted(), 3);
    assert_eq!(*summary.rendered(), 3);

    let images = f.project.project_dir.join(IMAGES_DIR);
    for shot in &f.project.shots {
        assert_eq!(shot.status, ShotStatus::Ready);
        let path = shot.reference_image_path.as_ref().unwrap();
        assert!(path.starts_with(&images));
        assert!(path.exists());
    }

    let saved = f.driver.store().load_project(&f.project.project_dir).unwrap();
    assert_eq!(saved.shots, f.project.shots);

    let tasks = f.driver.renderer().tasks();
    assert_eq!(tasks.len(), 3);
    assert_eq!(tasks[0].prompt(), "the keeper climbs stair 0");
    assert_eq!(tasks[0].params()["image_mode"], 1);
    assert_eq!(tasks[0].params()["resolution"], "480x832");
    assert_eq!(tasks[0].params()["seed"], -1);
    assert_eq!(tasks[0].params()["model_type"], "flux2");
    assert!(tasks[0].params().get("image_start").is_none());
}

#[tokio::test]
async fn test_image_pass_attaches_character_and_tier() {
    let settings = RenderConfig {
        resolution_tier: ResolutionTier::P720,
        ..RenderConfig::default()
    };
    let mut f = fixture(&[], settings, 1);
    let character = f.project.project_dir.join(CHARACTERS_DIR).join("keeper.png");
    std::fs::write(&character, b"png").unwrap();
    f.project.character_images = vec![PathBuf::from("/gone.png"), character.clone()];

    f.driver.render_images(&mut f.project).await.unwrap();

    let tasks = f.driver.renderer().tasks();
    assert_eq!(tasks[0].params()["resolution"], "720x1280");
    assert_eq!(
        tasks[0].params()["image_start"],
        character.to_str().unwrap()
    );
}

#[tokio::test]
async fn test_auto_approve_skips_review() {
    let settings = RenderConfig {
        auto_approve: true,
        ..RenderConfig::default()
    };
    let mut f = fixture(&[], settings, 2);

    f.driver.render_images(&mut f.project).await.unwrap();
    assert!(f.project.all_approved(RenderPhase::Image));
}

#[tokio::test]
async fn test_failed_renders_return_to_pending() {
    let outcomes = [Outcome::Fail, Outcome::Nothing, Outcome::Write];
    let mut f = fixture(&outcomes, RenderConfig::default(), 3);

    let summary = f.driver.render_images(&mut f.project).await.unwrap();
    assert_eq!(*summary.attempted(), 3);
    assert_eq!(*summary.rendered(), 1);

    let statuses: Vec<_> = f.project.shots.iter().map(|s| s.status).collect();
    assert_eq!(
        statuses,
        [ShotStatus::Pending, ShotStatus::Pending, ShotStatus::Ready]
    );
    assert!(f.project.shots[0].reference_image_path.is_none());
    assert!(f.project.shots[1].reference_image_path.is_none());

    let saved = f.driver.store().load_project(&f.project.project_dir).unwrap();
    assert_eq!(saved.shots[0].status, ShotStatus::Pending);
}

#[tokio::test]
async fn test_missing_model_is_rejected_up_front() {
    let mut f = fixture(&[], RenderConfig::default(), 2);
    f.project.image_model.clear();

    assert!(f.driver.render_images(&mut f.project).await.is_err());
    assert!(f.driver.renderer().tasks().is_empty());
    assert!(f.project.shots.iter().all(|s| s.status == ShotStatus::Pending));
}

#[tokio::test]
async fn test_review_then_rerender_only_rejected() {
    let mut f = fixture(&[], RenderConfig::default(), 2);
    f.driver.render_images(&mut f.project).await.unwrap();

    let approved = f.driver.approve(&mut f.project, 0, RenderPhase::Image).unwrap();
    assert_eq!(approved, ShotStatus::Approved);
    let rejected = f.driver.reject(&mut f.project, 1, RenderPhase::Image).unwrap();
    assert_eq!(rejected, ShotStatus::Rejected);

    let seed = f.project.shots[1].seed;
    assert!((0..RESEED_RANGE).contains(&seed));

    let saved = f.driver.store().load_project(&f.project.project_dir).unwrap();
    assert_eq!(saved.shots[1].status, ShotStatus::Rejected);
    assert_eq!(saved.shots[1].seed, seed);

    let summary = f.driver.render_images(&mut f.project).await.unwrap();
    assert_eq!(*summary.attempted(), 1);
    let tasks = f.driver.renderer().tasks();
    assert_eq!(tasks.last().unwrap().params()["seed"], seed);
    assert_eq!(f.project.shots[0].status, ShotStatus::Approved);
    assert_eq!(f.project.shots[1].status, ShotStatus::Ready);
}

#[tokio::test]
async fn test_review_requires_ready_shot() {
    let mut f = fixture(&[], RenderConfig::default(), 1);
    assert!(f.driver.approve(&mut f.project, 0, RenderPhase::Image).is_err());
    assert!(f.driver.reject(&mut f.project, 5, RenderPhase::Video).is_err());
    assert_eq!(f.project.shots[0].status, ShotStatus::Pending);
}

#[tokio::test]
async fn test_video_pass_uses_rendered_still() {
    let mut f = fixture(&[], RenderConfig::default(), 2);
    f.driver.render_images(&mut f.project).await.unwrap();

    let summary = f.driver.render_videos(&mut f.project).await.unwrap();
    assert_eq!(*summary.rendered(), 2);

    let tasks = f.driver.renderer().tasks();
    let video = &tasks[2];
    let still = f.project.shots[0].reference_image_path.clone().unwrap();
    assert_eq!(video.params()["image_start"], still.to_str().unwrap());
    assert_eq!(video.params()["video_length"], 121);
    assert_eq!(video.params()["resolution"], "480x832");
    assert!(video.params().get("image_mode").is_none());

    let videos = f.project.project_dir.join(VIDEOS_DIR);
    for shot in &f.project.shots {
        assert_eq!(shot.video_status, ShotStatus::Ready);
        assert_eq!(shot.status, ShotStatus::Ready);
        assert!(shot.video_path.as_ref().unwrap().starts_with(&videos));
        assert_eq!(shot.video_prompt_used.as_deref(), Some(shot.video_prompt.as_str()));
    }
}

#[tokio::test]
async fn test_storyboard_offline_fills_project() {
    let mut f = fixture(&[], RenderConfig::default(), 0);
    f.project.shot_count = 40;

    let count = f.driver.storyboard(&mut f.project).await;
    assert_eq!(count, 20);
    assert_eq!(f.project.shot_count, 20);
    assert!(f.project.shots.iter().all(|s| s.beat.contains("a lighthouse keeper")));

    let saved = f.driver.store().load_project(&f.project.project_dir).unwrap();
    assert_eq!(saved.shots.len(), 20);
}
