//! Shot lifecycle error types.

/// Reasons a shot operation was refused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ShotErrorKind {
    /// The requested status change is not an edge of the lifecycle
    #[display("Cannot {} a shot that is {}", event, from)]
    InvalidTransition {
        /// Status the shot was in
        from: String,
        /// Event that was applied
        event: String,
    },
    /// No shot at the given index
    #[display("Shot index {} out of range (project has {} shots)", index, len)]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Number of shots in the project
        len: usize,
    },
}

/// Shot error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Shot Error: {} at line {} in {}", kind, line, file)]
pub struct ShotError {
    /// The specific error condition
    pub kind: ShotErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl ShotError {
    /// Create a new ShotError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ShotErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
