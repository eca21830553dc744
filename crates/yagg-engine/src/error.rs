//! Errors reported by the engine.

use thiserror::Error;

/// A failed engine call.
///
/// The `Display` form is the raw backend message, envelope included
/// (`"Git error: ...; class=...; code=..."`). Cleaning it up for people is
/// the caller's job.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    /// No repository is open on the engine side.
    #[error("No repository open")]
    NoRepository,

    /// The path does not exist or cannot be canonicalized.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// The version-control backend rejected the operation.
    #[error("Git error: {0}")]
    Git(String),

    #[error("IO error: {0}")]
    Io(String),

    /// The request never reached the engine or its reply was lost.
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Convenience type alias for engine calls.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_repository_display() {
        assert_eq!(EngineError::NoRepository.to_string(), "No repository open");
    }

    #[test]
    fn git_error_keeps_envelope() {
        let err = EngineError::Git("reference not found; class=Reference (4); code=NotFound (-3)".into());
        assert_eq!(
            err.to_string(),
            "Git error: reference not found; class=Reference (4); code=NotFound (-3)"
        );
    }

    #[test]
    fn io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: EngineError = io.into();
        assert!(matches!(err, EngineError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }
}
