use std::path::{Path, PathBuf};

use nfs4d_types::FileHandle;

use crate::error::HandleResult;

/// The injective path<->handle map described in the data model: two
/// handles never share a path, and a path has at most one handle.
pub trait HandleTable: Send + Sync {
    /// Idempotent: returns the existing handle for `path` if one was
    /// already issued, otherwise assigns and records a fresh one.
    fn handle_for_path(&self, path: &Path) -> HandleResult<FileHandle>;

    /// Resolve a handle back to its path, or `Err(HandleError::Stale)` if
    /// it was never issued or has since been forgotten.
    fn path_for_handle(&self, handle: &FileHandle) -> HandleResult<PathBuf>;

    /// Atomically relabel `old` to `new` in both maps, preserving the
    /// handle identity.
    fn rename(&self, old: &Path, new: &Path) -> HandleResult<()>;

    /// Drop the handle (if any) bound to `path`. Subsequent
    /// `path_for_handle` calls for it return `Stale`. Called on
    /// REMOVE/RMDIR of a path.
    fn forget(&self, path: &Path);

    /// The root path's handle, assigned at construction.
    fn root_handle(&self) -> FileHandle;
}
