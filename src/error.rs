use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the session and progress core
#[derive(Debug, Error)]
pub enum TutorError {
    /// Rejected input: empty reference text, out-of-order keystroke, or an
    /// operation that does not apply to the session's current state.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The progress file exists but cannot be understood. History is never
    /// discarded silently; the caller decides what to tell the user.
    #[error("progress file {} is corrupt: {reason}", path.display())]
    CorruptState { path: PathBuf, reason: String },

    /// Reading or writing the progress file failed.
    #[error("could not access progress file {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TutorError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        TutorError::InvalidInput(msg.into())
    }

    pub fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TutorError::Persistence {
            path: path.into(),
            source,
        }
    }

    /// Persistence failures leave the in-memory session usable; the caller may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TutorError::Persistence { .. })
    }
}

pub type Result<T> = std::result::Result<T, TutorError>;
