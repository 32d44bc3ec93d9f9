//! Locating, downloading and installing the service binary.

use std::path::{Path, PathBuf};
use std::time::Duration;
use storyreel_error::{ServerError, ServerErrorKind, ServerResult};
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

const BINARY_NAME: &str = if cfg!(windows) { "ollama.exe" } else { "ollama" };

/// How the service gets installed on this platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallPlan {
    /// Shell script piped to `sh` (Linux)
    Script {
        /// Script location
        url: String,
    },
    /// Zipped application bundle unpacked into `~/Applications` (macOS)
    Archive {
        /// Archive location
        url: String,
    },
    /// Silent native installer executable (Windows)
    Installer {
        /// Installer location
        url: String,
    },
}

impl InstallPlan {
    /// The plan for the platform this binary was compiled for.
    pub fn for_current_platform() -> Self {
        if cfg!(target_os = "macos") {
            InstallPlan::Archive {
                url: "https://ollama.com/download/Ollama-darwin.zip".into(),
            }
        } else if cfg!(windows) {
            InstallPlan::Installer {
                url: "https://ollama.com/download/OllamaSetup.exe".into(),
            }
        } else {
            InstallPlan::Script {
                url: "https://ollama.com/install.sh".into(),
            }
        }
    }

    /// Download location of the installer artifact.
    pub fn url(&self) -> &str {
        match self {
            InstallPlan::Script { url }
            | InstallPlan::Archive { url }
            | InstallPlan::Installer { url } => url,
        }
    }

    /// File name the artifact is saved under.
    pub fn file_name(&self) -> &str {
        self.url()
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or("ollama-installer")
    }
}

/// Well-known installation paths for the service binary, in lookup order.
pub fn binary_candidates() -> Vec<PathBuf> {
    let home = dirs::home_dir();
    let mut candidates = Vec::new();

    if cfg!(target_os = "macos") {
        candidates.push(PathBuf::from("/usr/local/bin/ollama"));
        candidates.push(PathBuf::from("/opt/homebrew/bin/ollama"));
        candidates.push(PathBuf::from(
            "/Applications/Ollama.app/Contents/Resources/ollama",
        ));
        if let Some(home) = &home {
            candidates.push(home.join("Applications/Ollama.app/Contents/Resources/ollama"));
        }
    } else if cfg!(windows) {
        if let Some(local) = dirs::data_local_dir() {
            candidates.push(local.join("Programs").join("Ollama").join(BINARY_NAME));
        }
    } else {
        candidates.push(PathBuf::from("/usr/local/bin/ollama"));
        candidates.push(PathBuf::from("/usr/bin/ollama"));
        if let Some(home) = &home {
            candidates.push(home.join(".local/bin/ollama"));
        }
    }

    candidates
}

/// Find the service binary: explicit override, then well-known paths, then `PATH`.
#[instrument]
pub(crate) fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            debug!(path = %path.display(), "Using configured service binary");
            return Some(path.to_path_buf());
        }
        warn!(path = %path.display(), "Configured service binary does not exist");
    }

    if let Some(found) = binary_candidates().into_iter().find(|p| p.is_file()) {
        debug!(path = %found.display(), "Found service binary");
        return Some(found);
    }

    match which::which(BINARY_NAME) {
        Ok(found) => {
            debug!(path = %found.display(), "Found service binary on PATH");
            Some(found)
        }
        Err(_) => {
            debug!("No service binary found");
            None
        }
    }
}

/// Fetch the installer artifact into `dir`.
///
/// # Errors
///
/// Returns [`ServerErrorKind::Download`] for transport, status or write failures.
#[instrument(skip(plan), fields(url = plan.url()))]
pub(crate) async fn download(plan: &InstallPlan, dir: &Path, timeout: Duration) -> ServerResult<PathBuf> {
    let download_err = |msg: String| ServerError::new(ServerErrorKind::Download(msg));

    let bytes = reqwest::Client::new()
        .get(plan.url())
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| download_err(format!("request: {}", e)))?
        .error_for_status()
        .map_err(|e| download_err(format!("status: {}", e)))?
        .bytes()
        .await
        .map_err(|e| download_err(format!("body: {}", e)))?;

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| download_err(format!("create {}: {}", dir.display(), e)))?;

    let target = dir.join(plan.file_name());
    let tmp = target.with_extension("part");
    tokio::fs::write(&tmp, &bytes)
        .await
        .map_err(|e| download_err(format!("write {}: {}", tmp.display(), e)))?;
    tokio::fs::rename(&tmp, &target)
        .await
        .map_err(|e| download_err(format!("rename {}: {}", target.display(), e)))?;

    info!(path = %target.display(), bytes = bytes.len(), "Installer downloaded");
    Ok(target)
}

/// Run a downloaded installer artifact without user interaction.
///
/// # Errors
///
/// Returns [`ServerErrorKind::Install`] if the installer cannot run, exits
/// unsuccessfully or exceeds `timeout`.
#[instrument(skip(plan, artifact), fields(artifact = %artifact.display()))]
pub(crate) async fn install(plan: &InstallPlan, artifact: &Path, timeout: Duration) -> ServerResult<()> {
    match plan {
        InstallPlan::Script { .. } => {
            let mut cmd = Command::new("sh");
            cmd.arg(artifact);
            run_to_completion(cmd, timeout).await
        }
        InstallPlan::Installer { .. } => {
            let mut cmd = Command::new(artifact);
            cmd.args(["/VERYSILENT", "/NORESTART", "/SUPPRESSMSGBOXES"]);
            run_to_completion(cmd, timeout).await
        }
        InstallPlan::Archive { .. } => {
            let dest = dirs::home_dir()
                .map(|home| home.join("Applications"))
                .ok_or_else(|| {
                    ServerError::new(ServerErrorKind::Install("no home directory".into()))
                })?;
            let artifact = artifact.to_path_buf();
            tokio::task::spawn_blocking(move || extract_archive(&artifact, &dest))
                .await
                .map_err(|e| ServerError::new(ServerErrorKind::Install(format!("join: {}", e))))?
        }
    }
}

async fn run_to_completion(mut cmd: Command, timeout: Duration) -> ServerResult<()> {
    cmd.kill_on_drop(true);
    let output = tokio::time::timeout(timeout, cmd.output())
        .await
        .map_err(|_| {
            ServerError::new(ServerErrorKind::Install(format!(
                "installer timed out after {}s",
                timeout.as_secs()
            )))
        })?
        .map_err(|e| ServerError::new(ServerErrorKind::Install(format!("spawn: {}", e))))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ServerError::new(ServerErrorKind::Install(format!(
            "installer exited with {}: {}",
            output.status,
            stderr.trim()
        ))));
    }
    info!("Installer finished");
    Ok(())
}

fn extract_archive(archive: &Path, dest: &Path) -> ServerResult<()> {
    let install_err = |msg: String| ServerError::new(ServerErrorKind::Install(msg));

    std::fs::create_dir_all(dest)
        .map_err(|e| install_err(format!("create {}: {}", dest.display(), e)))?;
    let file = std::fs::File::open(archive)
        .map_err(|e| install_err(format!("open {}: {}", archive.display(), e)))?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| install_err(format!("read zip: {}", e)))?;
    zip.extract(dest)
        .map_err(|e| install_err(format!("extract: {}", e)))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let binary = dest.join("Ollama.app/Contents/Resources/ollama");
        if binary.is_file() {
            std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755))
                .map_err(|e| install_err(format!("chmod {}: {}", binary.display(), e)))?;
        }
    }

    info!(dest = %dest.display(), entries = zip.len(), "Application bundle extracted");
    Ok(())
}
