//! Layered configuration.
//!
//! Sources, later ones winning:
//! 1. Bundled defaults (`storyreel.toml` shipped with the crate)
//! 2. `~/.config/storyreel/storyreel.toml`
//! 3. `./storyreel.toml`
//! 4. `STORYREEL__<SECTION>__<KEY>` environment variables

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use storyreel_core::ResolutionTier;
use storyreel_error::{ConfigError, StoryreelError, StoryreelResult};
use storyreel_server::ServiceConfig;
use tracing::{debug, instrument};

const DEFAULT_CONFIG: &str = include_str!("../storyreel.toml");

/// Where projects are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectsConfig {
    /// Base directory for project folders; platform data dir when unset
    pub base_dir: Option<PathBuf>,
    /// Entries shown in the recent-projects list
    pub recent_limit: usize,
}

impl Default for ProjectsConfig {
    fn default() -> Self {
        Self {
            base_dir: None,
            recent_limit: 10,
        }
    }
}

impl ProjectsConfig {
    /// The configured base directory, or `<data dir>/storyreel/projects`.
    pub fn resolved_base_dir(&self) -> PathBuf {
        match &self.base_dir {
            Some(dir) => dir.clone(),
            None => dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("storyreel")
                .join("projects"),
        }
    }
}

/// How shots are rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Frame rate used to turn durations into frame counts
    pub fps: u32,
    /// Approve shots as soon as they render
    pub auto_approve: bool,
    /// Directory the renderer writes videos (and images, unless overridden) to
    pub output_dir: PathBuf,
    /// Directory the renderer writes images to, when different
    pub image_output_dir: Option<PathBuf>,
    /// Output resolution class
    pub resolution_tier: ResolutionTier,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fps: storyreel_storage::DEFAULT_FPS,
            auto_approve: false,
            output_dir: PathBuf::from("outputs"),
            image_output_dir: None,
            resolution_tier: ResolutionTier::default(),
        }
    }
}

/// Top-level storyreel configuration.
///
/// # Example
///
/// ```no_run
/// use storyreel::StoryreelConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = StoryreelConfig::load()?;
/// println!("Service at {}", config.service.base_url);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoryreelConfig {
    /// Local inference service
    pub service: ServiceConfig,
    /// Project storage
    pub projects: ProjectsConfig,
    /// Rendering
    pub render: RenderConfig,
}

impl StoryreelConfig {
    /// Load configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> StoryreelResult<Self> {
        debug!("Loading configuration from file");

        let config: Self = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                StoryreelError::from(ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    path.as_ref().display(),
                    e
                )))
            })?
            .try_deserialize()
            .map_err(parse_error)?;
        config.validate()?;
        Ok(config)
    }

    /// The defaults shipped with the crate.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundled file is malformed.
    pub fn bundled() -> StoryreelResult<Self> {
        Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .build()
            .map_err(build_error)?
            .try_deserialize()
            .map_err(parse_error)
    }

    /// Load configuration from every source, in precedence order.
    ///
    /// User files are optional and skipped when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if a present source is malformed or the merged
    /// settings are invalid.
    #[instrument]
    pub fn load() -> StoryreelResult<Self> {
        debug!("Loading configuration: env > current dir > home dir > bundled defaults");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/storyreel/storyreel.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder
            .add_source(File::with_name("storyreel").required(false))
            .add_source(
                Environment::with_prefix("STORYREEL")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: Self = builder
            .build()
            .map_err(build_error)?
            .try_deserialize()
            .map_err(parse_error)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the merged settings are usable.
    ///
    /// # Errors
    ///
    /// Returns an error for an unusable service URL or a zero frame rate.
    pub fn validate(&self) -> StoryreelResult<()> {
        self.service.validate()?;
        if self.render.fps == 0 {
            return Err(ConfigError::new("render.fps must be greater than zero").into());
        }
        Ok(())
    }
}

fn build_error(e: config::ConfigError) -> StoryreelError {
    StoryreelError::from(ConfigError::new(format!(
        "Failed to build configuration: {}",
        e
    )))
}

fn parse_error(e: config::ConfigError) -> StoryreelError {
    StoryreelError::from(ConfigError::new(format!(
        "Failed to parse configuration: {}",
        e
    )))
}
