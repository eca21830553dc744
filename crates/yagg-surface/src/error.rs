use thiserror::Error;

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("lock poisoned: {0}")]
    Poisoned(String),
}

pub type SurfaceResult<T> = Result<T, SurfaceError>;
