//! Project directories on disk.
//!
//! Every project lives in its own directory under a base directory:
//!
//! ```text
//! <base>/
//! └── a-lighthouse-keeper/
//!     ├── project.json
//!     ├── characters/
//!     ├── images/
//!     └── videos/
//! ```
//!
//! `project.json` is replaced with a temp file and a rename, so readers see
//! either the previous document or the new one.

use crate::slugify;
use chrono::{DateTime, Utc};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use storyreel_core::ProjectState;
use storyreel_error::{StorageError, StorageErrorKind, StorageResult};
use tracing::{debug, info, instrument, warn};

/// File holding the serialized project.
pub const PROJECT_FILE: &str = "project.json";
/// Subfolder for character reference images.
pub const CHARACTERS_DIR: &str = "characters";
/// Subfolder for rendered stills.
pub const IMAGES_DIR: &str = "images";
/// Subfolder for rendered clips.
pub const VIDEOS_DIR: &str = "videos";

const TEMP_SUFFIX: &str = "tmp";
const COLLISION_STAMP: &str = "%Y%m%d_%H%M%S_%3f";

/// Coarse age of a project for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, derive_more::Display)]
pub enum AgeBucket {
    /// Saved within the last hour
    #[display("{}m ago", _0)]
    Minutes(i64),
    /// Saved within the last day
    #[display("{}h ago", _0)]
    Hours(i64),
    /// Saved a day or more ago
    #[display("{}d ago", _0)]
    Days(i64),
}

impl AgeBucket {
    /// Bucket the time elapsed between `saved_at` and `now`.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{Duration, Utc};
    /// use storyreel_storage::AgeBucket;
    ///
    /// let now = Utc::now();
    /// assert_eq!(AgeBucket::between(now - Duration::minutes(5), now), AgeBucket::Minutes(5));
    /// assert_eq!(AgeBucket::between(now - Duration::hours(30), now).to_string(), "1d ago");
    /// ```
    pub fn between(saved_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let elapsed = (now - saved_at).max(chrono::Duration::zero());
        if elapsed < chrono::Duration::hours(1) {
            AgeBucket::Minutes(elapsed.num_minutes())
        } else if elapsed < chrono::Duration::days(1) {
            AgeBucket::Hours(elapsed.num_hours())
        } else {
            AgeBucket::Days(elapsed.num_days())
        }
    }
}

/// One entry of the recent-projects list.
#[derive(Debug, Clone, PartialEq, Serialize, Getters)]
pub struct ProjectSummary {
    /// Concept the project was created from
    concept: String,
    /// Wizard step the project was saved at
    step: u8,
    /// Age of the last save
    age: AgeBucket,
    /// Project directory
    path: PathBuf,
    /// Time of the last save
    saved_at: DateTime<Utc>,
}

/// The subset of `project.json` needed for a summary.
#[derive(Debug, Deserialize)]
struct SummaryFields {
    #[serde(default)]
    concept: String,
    #[serde(default)]
    current_step: u8,
    saved_at: DateTime<Utc>,
}

/// Filesystem store for projects under one base directory.
#[derive(Debug, Clone, Getters)]
pub struct ProjectStore {
    /// Directory holding one subdirectory per project
    base_dir: PathBuf,
}

impl ProjectStore {
    /// Store rooted at `base_dir`. Nothing is created until a project is.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Create a new project directory with its artifact subfolders.
    ///
    /// The directory name is the slug of `concept`; when taken, the smallest
    /// free suffix `-2`, `-3`, ... is appended.
    ///
    /// # Errors
    ///
    /// Returns [`StorageErrorKind::DirectoryCreation`] if any directory
    /// cannot be created.
    #[instrument(skip(self), fields(base = %self.base_dir.display()))]
    pub fn create_project(&self, concept: &str) -> StorageResult<PathBuf> {
        std::fs::create_dir_all(&self.base_dir).map_err(|e| directory_error(&self.base_dir, e))?;

        let slug = slugify(concept);
        let mut suffix = 1u32;
        let project_dir = loop {
            let name = match suffix {
                1 => slug.clone(),
                n => format!("{slug}-{n}"),
            };
            let candidate = self.base_dir.join(name);
            match std::fs::create_dir(&candidate) {
                Ok(()) => break candidate,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => suffix += 1,
                Err(e) => return Err(directory_error(&candidate, e)),
            }
        };

        for sub in [CHARACTERS_DIR, IMAGES_DIR, VIDEOS_DIR] {
            let path = project_dir.join(sub);
            std::fs::create_dir_all(&path).map_err(|e| directory_error(&path, e))?;
        }

        info!(path = %project_dir.display(), "Created project");
        Ok(project_dir)
    }

    /// Persist `state` to `<project_dir>/project.json` and stamp `saved_at`.
    ///
    /// Returns `false` and logs a warning if the write fails; `state` and the
    /// previous file are then left as they were.
    #[instrument(skip(self, state), fields(project = %state.project_dir.display()))]
    pub fn save_project(&self, state: &mut ProjectState) -> bool {
        let previous = state.saved_at;
        state.saved_at = Utc::now();
        match write_project(state) {
            Ok(()) => {
                debug!(shots = state.shots.len(), "Saved project");
                true
            }
            Err(e) => {
                state.saved_at = previous;
                warn!(error = %e, "Failed to save project");
                false
            }
        }
    }

    /// Load the project stored in `dir`.
    ///
    /// Returns `None` if the file is missing or cannot be parsed. The loaded
    /// state's `project_dir` is set to `dir`.
    #[instrument(skip(self, dir), fields(dir = %dir.as_ref().display()))]
    pub fn load_project(&self, dir: impl AsRef<Path>) -> Option<ProjectState> {
        let dir = dir.as_ref();
        match read_project(dir) {
            Ok(mut state) => {
                state.project_dir = dir.to_path_buf();
                debug!(shots = state.shots.len(), "Loaded project");
                Some(state)
            }
            Err(e) if matches!(e.kind, StorageErrorKind::NotFound(_)) => {
                debug!("No project file");
                None
            }
            Err(e) => {
                warn!(error = %e, "Failed to load project");
                None
            }
        }
    }

    /// Summaries of the most recently saved projects, newest first.
    ///
    /// Subdirectories without a readable project file are skipped.
    #[instrument(skip(self), fields(base = %self.base_dir.display()))]
    pub fn list_recent_projects(&self, max: usize) -> Vec<ProjectSummary> {
        let entries = match std::fs::read_dir(&self.base_dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(error = %e, "Project base directory not readable");
                return Vec::new();
            }
        };

        let now = Utc::now();
        let mut summaries: Vec<ProjectSummary> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .filter_map(|path| {
                let file = path.join(PROJECT_FILE);
                let text = std::fs::read_to_string(&file).ok()?;
                match serde_json::from_str::<SummaryFields>(&text) {
                    Ok(fields) => Some(ProjectSummary {
                        concept: fields.concept,
                        step: fields.current_step,
                        age: AgeBucket::between(fields.saved_at, now),
                        saved_at: fields.saved_at,
                        path,
                    }),
                    Err(e) => {
                        debug!(path = %file.display(), error = %e, "Skipping unreadable project");
                        None
                    }
                }
            })
            .collect();

        summaries.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        summaries.truncate(max);
        debug!(count = summaries.len(), "Listed recent projects");
        summaries
    }

    /// Copy an artifact into `<project_dir>/<subfolder>/`, keeping its name.
    ///
    /// An existing file is never overwritten: the copy gets a timestamp
    /// inserted before its extension instead.
    ///
    /// # Errors
    ///
    /// - [`StorageErrorKind::NotFound`] if `source` does not exist
    /// - [`StorageErrorKind::InvalidPath`] if `source` has no file name
    /// - [`StorageErrorKind::DirectoryCreation`] / [`StorageErrorKind::FileWrite`]
    ///   on I/O failure
    #[instrument(skip(self, source, project_dir), fields(source = %source.as_ref().display()))]
    pub fn copy_into_project(
        &self,
        source: impl AsRef<Path>,
        project_dir: impl AsRef<Path>,
        subfolder: &str,
    ) -> StorageResult<PathBuf> {
        let source = source.as_ref();
        if !source.is_file() {
            return Err(StorageError::new(StorageErrorKind::NotFound(
                source.display().to_string(),
            )));
        }
        let file_name = source.file_name().ok_or_else(|| {
            StorageError::new(StorageErrorKind::InvalidPath(source.display().to_string()))
        })?;

        let folder = project_dir.as_ref().join(subfolder);
        std::fs::create_dir_all(&folder).map_err(|e| directory_error(&folder, e))?;

        let mut destination = folder.join(file_name);
        let mut attempt = 1u32;
        while destination.exists() {
            destination = folder.join(stamped_name(source, attempt));
            attempt += 1;
        }

        std::fs::copy(source, &destination).map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "copy {} to {}: {}",
                source.display(),
                destination.display(),
                e
            )))
        })?;

        info!(destination = %destination.display(), "Copied artifact into project");
        Ok(destination)
    }

    /// Files in `<project_dir>/<subfolder>/` with one of `extensions`,
    /// newest first. Extensions are matched case-insensitively, without dot.
    pub fn scan_project_gallery(
        &self,
        project_dir: impl AsRef<Path>,
        subfolder: &str,
        extensions: &[&str],
    ) -> Vec<PathBuf> {
        let folder = project_dir.as_ref().join(subfolder);
        let Ok(entries) = std::fs::read_dir(&folder) else {
            return Vec::new();
        };

        let mut found: Vec<(SystemTime, PathBuf)> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && has_extension(path, extensions))
            .map(|path| {
                let modified = path
                    .metadata()
                    .and_then(|m| m.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                (modified, path)
            })
            .collect();

        found.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        found.into_iter().map(|(_, path)| path).collect()
    }
}

/// Whether `path` has one of `extensions` (no dot, any case).
pub(crate) fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
}

fn stamped_name(source: &Path, attempt: u32) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    let stamp = Utc::now().format(COLLISION_STAMP);
    let stem = match attempt {
        1 => format!("{stem}_{stamp}"),
        n => format!("{stem}_{stamp}_{n}"),
    };
    match source.extension() {
        Some(ext) => format!("{stem}.{}", ext.to_string_lossy()),
        None => stem,
    }
}

fn write_project(state: &ProjectState) -> StorageResult<()> {
    let dir = &state.project_dir;
    if !dir.is_dir() {
        return Err(StorageError::new(StorageErrorKind::NotFound(
            dir.display().to_string(),
        )));
    }

    let json = serde_json::to_string_pretty(state)
        .map_err(|e| StorageError::new(StorageErrorKind::Serialization(e.to_string())))?;

    let path = dir.join(PROJECT_FILE);
    let temp_path = path.with_extension(format!("json.{TEMP_SUFFIX}"));

    if let Err(e) = std::fs::write(&temp_path, json) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(StorageError::new(StorageErrorKind::FileWrite(format!(
            "{}: {}",
            temp_path.display(),
            e
        ))));
    }

    std::fs::rename(&temp_path, &path).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        StorageError::new(StorageErrorKind::FileWrite(format!(
            "rename {} to {}: {}",
            temp_path.display(),
            path.display(),
            e
        )))
    })
}

fn read_project(dir: &Path) -> StorageResult<ProjectState> {
    let path = dir.join(PROJECT_FILE);
    let text = std::fs::read_to_string(&path).map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            StorageError::new(StorageErrorKind::NotFound(path.display().to_string()))
        } else {
            StorageError::new(StorageErrorKind::FileRead(format!(
                "{}: {}",
                path.display(),
                e
            )))
        }
    })?;
    serde_json::from_str(&text).map_err(|e| {
        StorageError::new(StorageErrorKind::Serialization(format!(
            "{}: {}",
            path.display(),
            e
        )))
    })
}

fn directory_error(path: &Path, e: std::io::Error) -> StorageError {
    StorageError::new(StorageErrorKind::DirectoryCreation(format!(
        "{}: {}",
        path.display(),
        e
    )))
}
