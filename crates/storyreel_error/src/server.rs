//! Error types for the local inference service.

/// Error kinds for inference service operations.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
pub enum ServerErrorKind {
    /// HTTP request failed
    #[display("HTTP request failed: {}", _0)]
    Http(String),

    /// Service answered with a non-success status
    #[display("API error: {}", _0)]
    Api(String),

    /// Failed to deserialize response
    #[display("Failed to deserialize response: {}", _0)]
    Deserialization(String),

    /// Configuration error
    #[display("Configuration error: {}", _0)]
    Configuration(String),

    /// A subprocess could not be spawned or exited unsuccessfully
    #[display("Process error: {}", _0)]
    Process(String),

    /// An operation exceeded its time budget
    #[display("Timed out after {}s: {}", seconds, operation)]
    Timeout {
        /// What was being waited on
        operation: String,
        /// Budget that was exceeded
        seconds: u64,
    },

    /// Installer download failed
    #[display("Download failed: {}", _0)]
    Download(String),

    /// Installer ran but did not produce a usable installation
    #[display("Install failed: {}", _0)]
    Install(String),
}

/// Error wrapper with location tracking.
///
/// # Examples
///
/// ```
/// use storyreel_error::{ServerError, ServerErrorKind};
///
/// let err = ServerError::new(ServerErrorKind::Process("exit status 1".into()));
/// assert!(format!("{}", err).contains("exit status 1"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Server Error: {} at line {} in {}", kind, line, file)]
pub struct ServerError {
    /// The error kind
    pub kind: ServerErrorKind,
    /// Line number where error occurred
    pub line: u32,
    /// File where error occurred
    pub file: &'static str,
}

impl ServerError {
    /// Create a new ServerError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ServerErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

/// Result type for inference service operations.
pub type ServerResult<T> = Result<T, ServerError>;
