//! Error types for storyreel.
//!
//! Every error follows the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum names the specific failure
//! - `*Error` struct wraps the kind together with the source location
//! - constructors are `#[track_caller]`, so the location is captured automatically
//!
//! # Examples
//!
//! ```
//! use storyreel_error::{ServerError, ServerErrorKind, StoryreelResult};
//!
//! fn probe() -> StoryreelResult<()> {
//!     Err(ServerError::new(ServerErrorKind::Http("connection refused".into())))?
//! }
//!
//! assert!(probe().is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod narrative;
mod server;
mod shot;
mod storage;

pub use config::ConfigError;
pub use error::{StoryreelError, StoryreelErrorKind, StoryreelResult};
pub use narrative::{NarrativeError, NarrativeErrorKind, NarrativeResult};
pub use server::{ServerError, ServerErrorKind, ServerResult};
pub use shot::{ShotError, ShotErrorKind};
pub use storage::{StorageError, StorageErrorKind, StorageResult};
