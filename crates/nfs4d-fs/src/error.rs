use thiserror::Error;

/// Errors from the filesystem oracle. Callers translate these to
/// [`nfs4d_types::NfsStatus`] via [`nfs4d_types::NfsStatus::from_io_error`]
/// at the compound-engine boundary; this crate itself stays errno-shaped.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("path not found: {0}")]
    NotFound(String),

    #[error("not a directory: {0}")]
    NotDirectory(String),

    #[error("is a directory: {0}")]
    IsDirectory(String),

    #[error("directory not empty: {0}")]
    NotEmpty(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("cross-device rename from {0} to {1}")]
    CrossDevice(String, String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type FsResult<T> = Result<T, FsError>;
