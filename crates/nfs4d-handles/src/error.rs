use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandleError {
    /// `path_for_handle` was called with a handle that has been forgotten
    /// (its path was removed/renamed away) or was never issued.
    #[error("stale filehandle")]
    Stale,

    /// The CSPRNG produced an id already present in the table. Fatal per
    /// the handle table's injectivity invariant; unreachable in practice
    /// at 128 bits of entropy.
    #[error("handle id collision for path {0:?}")]
    Collision(PathBuf),
}

pub type HandleResult<T> = Result<T, HandleError>;
