//! Content pipeline behaviour against a scripted driver.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use storyreel_core::{GenerateRequest, GenreWeights, InferenceDriver, ShotDraft};
use storyreel_error::{ServerError, ServerErrorKind, StoryreelResult};
use storyreel_narrative::{ContentPipeline, PromptPurpose};

/// Answers generation calls from a queue; an empty queue is an error.
struct ScriptedDriver {
    online: bool,
    replies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<GenerateRequest>>,
    probes: AtomicUsize,
}

impl ScriptedDriver {
    fn offline() -> Self {
        Self::with_replies(false, &[])
    }

    fn with_replies(online: bool, replies: &[&str]) -> Self {
        Self {
            online,
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            requests: Mutex::new(Vec::new()),
            probes: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn request(&self, index: usize) -> GenerateRequest {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl InferenceDriver for ScriptedDriver {
    async fn is_online(&self) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.online
    }

    async fn generate(&self, request: &GenerateRequest) -> StoryreelResult<String> {
        self.requests.lock().unwrap().push(request.clone());
        match self.replies.lock().unwrap().pop_front() {
            Some(reply) => Ok(reply),
            None => Err(ServerError::new(ServerErrorKind::Http("connection refused".into())).into()),
        }
    }
}

fn weights(pairs: &[(&str, u32)]) -> GenreWeights {
    pairs.iter().map(|(g, w)| (g.to_string(), *w)).collect()
}

fn assert_unrefined(drafts: &[ShotDraft]) {
    for draft in drafts {
        assert_eq!(draft.image_prompt, draft.beat);
        assert_eq!(draft.video_prompt, draft.beat);
    }
}

#[tokio::test]
async fn test_offline_lighthouse_keeper_uses_one_template() {
    let pipeline = ContentPipeline::with_seed(ScriptedDriver::offline(), 3);
    let zero = weights(&[("action", 0), ("drama", 0), ("horror", 0)]);

    let drafts = pipeline
        .generate_shots("a lighthouse keeper", 3, &zero, "flux", "ltx2")
        .await;

    assert_eq!(drafts.len(), 3);
    assert!(drafts.iter().all(|d| d.beat.contains("lighthouse keeper")));
    assert_unrefined(&drafts);
    assert_eq!(drafts[0].label, "Shot 1");
    assert_eq!(pipeline.driver().calls(), 0);

    let template = storyreel_narrative::templates()
        .iter()
        .find(|t| t.fill("a lighthouse keeper", 3) == drafts.iter().map(|d| d.beat.clone()).collect::<Vec<_>>());
    assert!(template.is_some(), "beats come from a single template's first three");
}

#[tokio::test]
async fn test_shot_count_is_clamped_offline() {
    let pipeline = ContentPipeline::with_seed(ScriptedDriver::offline(), 1);
    let w = weights(&[("scifi", 10)]);

    for (requested, expected) in [(0, 2), (1, 2), (2, 2), (9, 9), (15, 15), (20, 20), (50, 20)] {
        let drafts = pipeline.generate_shots("a courier", requested, &w, "", "").await;
        assert_eq!(drafts.len(), expected, "requested {requested}");
        assert_unrefined(&drafts);
    }
}

#[tokio::test]
async fn test_empty_weights_default_to_action() {
    let pipeline = ContentPipeline::with_seed(ScriptedDriver::offline(), 9);
    let action = storyreel_narrative::templates()
        .iter()
        .find(|t| t.genre() == "action")
        .unwrap();

    let drafts = pipeline.generate_shots("", 4, &GenreWeights::new(), "", "").await;

    let beats: Vec<_> = drafts.into_iter().map(|d| d.beat).collect();
    assert_eq!(beats, action.fill("the hero", 4));
}

#[tokio::test]
async fn test_online_beats_parsed_from_fenced_answer() {
    let reply = "Here is your storyboard:\n```json\n[\
        {\"prompt\": \"A keeper climbs the spiral stair\", \"shot_label\": \"The Climb\"},\
        {\"prompt\": \"The lamp sweeps a stormy sea\", \"shot_label\": \"\"}\
        ]\n```";
    let pipeline = ContentPipeline::with_seed(ScriptedDriver::with_replies(true, &[reply]), 0);

    let drafts = pipeline
        .generate_shots("a lighthouse keeper", 2, &weights(&[("drama", 2), ("horror", 1)]), "", "")
        .await;

    assert_eq!(drafts[0].beat, "A keeper climbs the spiral stair");
    assert_eq!(drafts[0].label, "The Climb");
    assert_eq!(drafts[1].label, "Shot 2");
    assert_unrefined(&drafts);

    let request = pipeline.driver().request(0);
    assert_eq!(request.temperature, 0.9);
    assert_eq!(request.max_tokens, 4096);
    assert!(request.prompt.contains("\"a lighthouse keeper\""));
    assert!(request.prompt.contains("drama (67%), horror (33%)"));
    assert!(request.system.contains("exactly 2"));
}

#[tokio::test]
async fn test_short_answer_falls_back_to_templates() {
    let reply = r#"[{"prompt": "only one shot"}]"#;
    let pipeline = ContentPipeline::with_seed(ScriptedDriver::with_replies(true, &[reply]), 5);

    let drafts = pipeline
        .generate_shots("a tired courier", 4, &weights(&[("romance", 1)]), "flux", "")
        .await;

    assert_eq!(drafts.len(), 4);
    assert!(drafts.iter().all(|d| d.beat.contains("a tired courier")));
    assert_unrefined(&drafts);
    assert_eq!(pipeline.driver().calls(), 1);
}

#[tokio::test]
async fn test_garbage_answer_falls_back_to_templates() {
    let pipeline = ContentPipeline::with_seed(
        ScriptedDriver::with_replies(true, &["I'm sorry, I can't help with that."]),
        5,
    );

    let drafts = pipeline.generate_shots("a fox", 3, &weights(&[("fantasy", 1)]), "", "").await;

    assert_eq!(drafts.len(), 3);
    assert!(drafts.iter().all(|d| d.beat.contains("a fox")));
}

#[tokio::test]
async fn test_generation_then_refinement() {
    let beats = r#"[{"prompt": "beat one", "shot_label": "One"}, {"prompt": "beat two", "shot_label": "Two"}]"#;
    let refined = r#"Sure: [{"imagePrompt": "image one", "videoPrompt": "video one"},
                     {"imagePrompt": "image two", "videoPrompt": "video two"}]"#;
    let pipeline =
        ContentPipeline::with_seed(ScriptedDriver::with_replies(true, &[beats, refined]), 0);

    let drafts = pipeline
        .generate_shots("x", 2, &GenreWeights::new(), "flux", "ltx2")
        .await;

    assert_eq!(drafts[0].beat, "beat one");
    assert_eq!(drafts[0].image_prompt, "image one");
    assert_eq!(drafts[1].video_prompt, "video two");

    let request = pipeline.driver().request(1);
    assert_eq!(request.temperature, 0.4);
    assert!(request.system.contains("IMAGE MODEL GUIDE"));
    assert!(request.system.contains("VIDEO MODEL GUIDE"));
    assert!(request.system.contains("AUDIO (REQUIRED"));
    assert!(request.prompt.contains("1. \"beat one\""));
}

#[tokio::test]
async fn test_refine_batch_rejects_length_mismatch() {
    let reply = r#"[{"imagePrompt": "a", "videoPrompt": "b"}]"#;
    let pipeline = ContentPipeline::new(ScriptedDriver::with_replies(true, &[reply]));
    let drafts = vec![
        ShotDraft::unrefined("first", "Shot 1"),
        ShotDraft::unrefined("second", "Shot 2"),
    ];

    assert!(pipeline.refine_batch(&drafts, "flux", "t2v").await.is_none());
}

#[tokio::test]
async fn test_refine_batch_skipped_without_any_guide() {
    let pipeline = ContentPipeline::new(ScriptedDriver::with_replies(true, &["[]"]));
    let drafts = vec![ShotDraft::unrefined("first", "Shot 1")];

    assert!(pipeline.refine_batch(&drafts, "sdxl", "").await.is_none());
    assert_eq!(pipeline.driver().calls(), 0);
}

#[tokio::test]
async fn test_refine_batch_keeps_beat_for_unguided_field() {
    let reply = r#"[{"imagePrompt": "rewritten still", "videoPrompt": "should be ignored"}]"#;
    let pipeline = ContentPipeline::new(ScriptedDriver::with_replies(true, &[reply]));
    let drafts = vec![ShotDraft::unrefined("original beat", "Shot 1")];

    let refined = pipeline
        .refine_batch(&drafts, "flux2_dev", "some_unknown_video_model")
        .await
        .unwrap();

    assert_eq!(refined[0].image_prompt, "rewritten still");
    assert_eq!(refined[0].video_prompt, "original beat");
    assert!(!pipeline.driver().request(0).system.contains("VIDEO MODEL GUIDE"));
}

#[tokio::test]
async fn test_refine_single_without_guide_is_identity() {
    let pipeline = ContentPipeline::new(ScriptedDriver::with_replies(true, &["never used"]));
    let raw = "A keeper trims the wick by candlelight";

    for _ in 0..3 {
        assert_eq!(pipeline.refine_single(raw, "sdxl", PromptPurpose::Image).await, raw);
    }
    assert_eq!(pipeline.driver().calls(), 0);
    assert_eq!(pipeline.driver().probes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_refine_single_offline_is_identity() {
    let pipeline = ContentPipeline::new(ScriptedDriver::offline());
    let raw = "A keeper trims the wick by candlelight";

    assert_eq!(pipeline.refine_single(raw, "ltx2", PromptPurpose::Video).await, raw);
    assert_eq!(pipeline.driver().calls(), 0);
}

#[tokio::test]
async fn test_refine_single_strips_wrapping_and_rejects_short_answers() {
    let pipeline = ContentPipeline::new(ScriptedDriver::with_replies(
        true,
        &[
            "\"A slow dolly in on a keeper trimming the wick, warm candlelight.\"",
            "\"ok\"",
        ],
    ));
    let raw = "keeper trims wick";

    let refined = pipeline.refine_single(raw, "t2v", PromptPurpose::Video).await;
    assert_eq!(refined, "A slow dolly in on a keeper trimming the wick, warm candlelight.");

    let refined = pipeline.refine_single(raw, "t2v", PromptPurpose::Video).await;
    assert_eq!(refined, raw);

    let request = pipeline.driver().request(0);
    assert_eq!(request.prompt, raw);
    assert!(request.system.contains("single video prompt"));
}

#[tokio::test]
async fn test_refine_single_call_failure_returns_raw() {
    let pipeline = ContentPipeline::new(ScriptedDriver::with_replies(true, &[]));
    let raw = "a red kite over dunes";

    assert_eq!(pipeline.refine_single(raw, "flux", PromptPurpose::Image).await, raw);
    assert_eq!(pipeline.driver().calls(), 1);
}

#[tokio::test]
async fn test_describe_reference_image_attaches_base64() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hero.png");
    std::fs::write(&path, b"png-bytes").unwrap();

    let pipeline = ContentPipeline::new(ScriptedDriver::with_replies(
        true,
        &["A woman in a yellow raincoat on a pier."],
    ));
    let description = pipeline.describe_reference_image(&path).await;

    assert_eq!(description.as_deref(), Some("A woman in a yellow raincoat on a pier."));
    let request = pipeline.driver().request(0);
    assert_eq!(request.images, vec!["cG5nLWJ5dGVz".to_string()]);
}

#[tokio::test]
async fn test_describe_reference_image_missing_file_or_offline() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.png");

    let online = ContentPipeline::new(ScriptedDriver::with_replies(true, &["unused"]));
    assert!(online.describe_reference_image(&missing).await.is_none());
    assert_eq!(online.driver().calls(), 0);

    let offline = ContentPipeline::new(ScriptedDriver::offline());
    assert!(offline.describe_reference_image(&missing).await.is_none());
}
