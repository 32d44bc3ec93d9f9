//! Filesystem behaviour of the project store.

use chrono::{Duration, Utc};
use std::path::Path;
use storyreel_core::{ProjectState, RenderPhase, ResolutionTier, Shot, ShotEvent, ShotStatus, Vibe};
use storyreel_storage::{
    CHARACTERS_DIR, IMAGES_DIR, PROJECT_FILE, ProjectStore, VIDEOS_DIR, slugify,
};

fn project_with_shots(dir: &Path) -> ProjectState {
    let mut project = ProjectState::new(dir, "a lighthouse keeper");
    project.vibe = Vibe::Vertical;
    project.resolution_tier = ResolutionTier::P720;
    project.video_model = "ltx2".to_string();
    project.current_step = 4;

    let mut first = Shot::new("a keeper lights the lamp");
    first.apply(RenderPhase::Image, ShotEvent::StartRender).unwrap();
    first
        .apply(RenderPhase::Image, ShotEvent::RenderSucceeded { auto_approve: false })
        .unwrap();
    first.seed = 4242;
    first.reference_image_path = Some(dir.join(IMAGES_DIR).join("frame.png"));

    let mut second = Shot::new("storm clouds gather");
    second.status = ShotStatus::Approved;
    second.video_status = ShotStatus::Rejected;

    project.shots = vec![first, second];
    project
}

#[test]
fn test_create_project_twice_yields_distinct_directories() {
    let base = tempfile::tempdir().unwrap();
    let store = ProjectStore::new(base.path().join("projects"));

    let first = store.create_project("A Lighthouse Keeper").unwrap();
    let second = store.create_project("A Lighthouse Keeper").unwrap();
    let third = store.create_project("A Lighthouse Keeper").unwrap();

    assert_eq!(first.file_name().unwrap(), "a-lighthouse-keeper");
    assert_eq!(second.file_name().unwrap(), "a-lighthouse-keeper-2");
    assert_eq!(third.file_name().unwrap(), "a-lighthouse-keeper-3");
    for dir in [&first, &second, &third] {
        for sub in [CHARACTERS_DIR, IMAGES_DIR, VIDEOS_DIR] {
            assert!(dir.join(sub).is_dir());
        }
    }
}

#[test]
fn test_create_project_with_blank_concept() {
    let base = tempfile::tempdir().unwrap();
    let store = ProjectStore::new(base.path());

    let dir = store.create_project("  !!  ").unwrap();
    assert_eq!(dir.file_name().unwrap(), slugify("").as_str());
}

#[test]
fn test_save_then_load_round_trips() {
    let base = tempfile::tempdir().unwrap();
    let store = ProjectStore::new(base.path());
    let dir = store.create_project("a lighthouse keeper").unwrap();

    let mut project = project_with_shots(&dir);
    assert!(store.save_project(&mut project));

    let loaded = store.load_project(&dir).unwrap();
    assert_eq!(loaded, project);
    assert_eq!(loaded.shots[0].status, ShotStatus::Ready);
    assert_eq!(loaded.shots[1].video_status, ShotStatus::Rejected);
    assert!(!dir.join("project.json.tmp").exists());
}

#[test]
fn test_save_stamps_saved_at() {
    let base = tempfile::tempdir().unwrap();
    let store = ProjectStore::new(base.path());
    let dir = store.create_project("stamp").unwrap();

    let mut project = ProjectState::new(&dir, "stamp");
    project.saved_at = Utc::now() - Duration::days(3);
    let before = Utc::now();
    assert!(store.save_project(&mut project));
    assert!(project.saved_at >= before);
}

#[test]
fn test_save_into_missing_directory_reports_failure() {
    let base = tempfile::tempdir().unwrap();
    let store = ProjectStore::new(base.path());
    let missing = base.path().join("never-created");

    let mut project = ProjectState::new(&missing, "ghost");
    let stamp = project.saved_at;
    assert!(!store.save_project(&mut project));
    assert_eq!(project.saved_at, stamp);
    assert!(!missing.exists());
}

#[test]
fn test_load_missing_or_corrupt_returns_none() {
    let base = tempfile::tempdir().unwrap();
    let store = ProjectStore::new(base.path());
    let dir = store.create_project("broken").unwrap();

    assert!(store.load_project(&dir).is_none());

    std::fs::write(dir.join(PROJECT_FILE), "{ not json").unwrap();
    assert!(store.load_project(&dir).is_none());
}

#[test]
fn test_failed_save_keeps_previous_file() {
    let base = tempfile::tempdir().unwrap();
    let store = ProjectStore::new(base.path());
    let dir = store.create_project("keep").unwrap();

    let mut project = project_with_shots(&dir);
    assert!(store.save_project(&mut project));

    let mut elsewhere = project.clone();
    elsewhere.project_dir = base.path().join("gone");
    elsewhere.concept = "changed".to_string();
    assert!(!store.save_project(&mut elsewhere));

    assert_eq!(store.load_project(&dir).unwrap().concept, "a lighthouse keeper");
}

#[test]
fn test_recent_projects_sorted_and_limited() {
    let base = tempfile::tempdir().unwrap();
    let store = ProjectStore::new(base.path());

    for (concept, days_ago) in [("oldest", 5), ("newest", 0), ("middle", 2)] {
        let dir = store.create_project(concept).unwrap();
        let mut project = ProjectState::new(&dir, concept);
        assert!(store.save_project(&mut project));

        let mut json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.join(PROJECT_FILE)).unwrap())
                .unwrap();
        json["saved_at"] = serde_json::json!(Utc::now() - Duration::days(days_ago));
        std::fs::write(dir.join(PROJECT_FILE), json.to_string()).unwrap();
    }
    std::fs::create_dir(base.path().join("not-a-project")).unwrap();
    std::fs::write(base.path().join("stray.txt"), "x").unwrap();

    let recent = store.list_recent_projects(10);
    let concepts: Vec<_> = recent.iter().map(|s| s.concept().as_str()).collect();
    assert_eq!(concepts, ["newest", "middle", "oldest"]);
    assert_eq!(recent[2].age().to_string(), "5d ago");
    assert_eq!(*recent[0].step(), 1);

    assert_eq!(store.list_recent_projects(2).len(), 2);
    assert!(store.list_recent_projects(0).is_empty());
}

#[test]
fn test_recent_projects_missing_base_is_empty() {
    let base = tempfile::tempdir().unwrap();
    let store = ProjectStore::new(base.path().join("nothing-here"));
    assert!(store.list_recent_projects(5).is_empty());
}

#[test]
fn test_copy_into_project_never_overwrites() {
    let base = tempfile::tempdir().unwrap();
    let store = ProjectStore::new(base.path().join("projects"));
    let dir = store.create_project("copy").unwrap();

    let output = base.path().join("renderer-out");
    std::fs::create_dir_all(&output).unwrap();
    let source = output.join("frame_0001.png");
    std::fs::write(&source, b"first").unwrap();

    let first = store.copy_into_project(&source, &dir, IMAGES_DIR).unwrap();
    assert_eq!(first, dir.join(IMAGES_DIR).join("frame_0001.png"));

    std::fs::write(&source, b"second").unwrap();
    let second = store.copy_into_project(&source, &dir, IMAGES_DIR).unwrap();
    assert_ne!(first, second);
    assert_eq!(second.extension().unwrap(), "png");
    assert!(
        second
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("frame_0001_")
    );

    assert_eq!(std::fs::read(&first).unwrap(), b"first");
    assert_eq!(std::fs::read(&second).unwrap(), b"second");
}

#[test]
fn test_copy_missing_source_fails() {
    let base = tempfile::tempdir().unwrap();
    let store = ProjectStore::new(base.path());
    let dir = store.create_project("copy").unwrap();

    let result = store.copy_into_project(base.path().join("nope.mp4"), &dir, VIDEOS_DIR);
    assert!(result.is_err());
}

#[test]
fn test_gallery_filters_by_extension() {
    let base = tempfile::tempdir().unwrap();
    let store = ProjectStore::new(base.path());
    let dir = store.create_project("gallery").unwrap();
    let images = dir.join(IMAGES_DIR);

    std::fs::write(images.join("a.png"), b"a").unwrap();
    std::fs::write(images.join("b.JPG"), b"b").unwrap();
    std::fs::write(images.join("notes.txt"), b"c").unwrap();

    let found = store.scan_project_gallery(&dir, IMAGES_DIR, &["png", "jpg", "jpeg", "webp"]);
    assert_eq!(found.len(), 2);
    assert!(found.iter().all(|p| p.extension().unwrap() != "txt"));

    assert!(store.scan_project_gallery(&dir, "missing", &["png"]).is_empty());
}
