//! Content generation error types.

/// Specific error conditions for shot generation and prompt refinement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum NarrativeErrorKind {
    /// A target model identifier was required but not given
    #[display("No {} model selected", _0)]
    MissingModel(String),
    /// The model response held no recoverable JSON array
    #[display("No structured array in response ({} chars)", _0)]
    NoStructuredArray(usize),
    /// The model returned a different number of rows than requested
    #[display("Expected {} rows, got {}", expected, actual)]
    RowCountMismatch {
        /// Rows requested
        expected: usize,
        /// Rows received
        actual: usize,
    },
    /// The generation call itself failed
    #[display("Generation failed: {}", _0)]
    Generation(String),
}

/// Error type for content generation.
///
/// # Examples
///
/// ```
/// use storyreel_error::{NarrativeError, NarrativeErrorKind};
///
/// let err = NarrativeError::new(NarrativeErrorKind::RowCountMismatch { expected: 4, actual: 3 });
/// assert!(format!("{}", err).contains("Expected 4 rows"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Narrative Error: {} at line {} in {}", kind, line, file)]
pub struct NarrativeError {
    /// The specific error condition
    pub kind: NarrativeErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl NarrativeError {
    /// Create a new NarrativeError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: NarrativeErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

/// Result type for content generation.
pub type NarrativeResult<T> = Result<T, NarrativeError>;
