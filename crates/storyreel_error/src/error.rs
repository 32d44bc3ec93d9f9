//! Top-level error wrapper types.

use crate::{ConfigError, NarrativeError, ServerError, ShotError, StorageError};

/// Every error a storyreel crate can raise.
///
/// # Examples
///
/// ```
/// use storyreel_error::{ServerError, ServerErrorKind, StoryreelError};
///
/// let err: StoryreelError = ServerError::new(ServerErrorKind::Http("Connection failed".into())).into();
/// assert!(format!("{}", err).contains("Connection failed"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum StoryreelErrorKind {
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Local inference service error
    #[from(ServerError)]
    Server(ServerError),
    /// Project storage error
    #[from(StorageError)]
    Storage(StorageError),
    /// Content generation error
    #[from(NarrativeError)]
    Narrative(NarrativeError),
    /// Shot lifecycle error
    #[from(ShotError)]
    Shot(ShotError),
}

/// Storyreel error with kind discrimination.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Storyreel Error: {}", _0)]
pub struct StoryreelError(Box<StoryreelErrorKind>);

impl StoryreelError {
    /// Create a new error from a kind.
    pub fn new(kind: StoryreelErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &StoryreelErrorKind {
        &self.0
    }
}

impl<T> From<T> for StoryreelError
where
    T: Into<StoryreelErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for storyreel operations.
pub type StoryreelResult<T> = std::result::Result<T, StoryreelError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ServerErrorKind, StorageErrorKind};

    #[test]
    fn test_transport_failures_surface_as_server_errors() {
        let err: StoryreelError = ServerError::new(ServerErrorKind::Http("refused".into())).into();
        match err.kind() {
            StoryreelErrorKind::Server(inner) => {
                assert_eq!(inner.kind, ServerErrorKind::Http("refused".into()));
            }
            other => panic!("unexpected kind: {other}"),
        }
    }

    #[test]
    fn test_display_names_the_inner_error() {
        let err: StoryreelError = StorageError::new(StorageErrorKind::NotFound("a.png".into())).into();
        assert!(err.to_string().starts_with("Storyreel Error: "));
        assert!(err.to_string().contains("a.png"));
    }
}
