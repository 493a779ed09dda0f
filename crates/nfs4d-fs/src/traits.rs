use std::path::Path;

use crate::entry::{AttrChange, DirEntry, OracleAttrs};
use crate::error::FsResult;

/// The local-filesystem abstraction the rest of the server treats as
/// ground truth.
///
/// Every method here maps to one or a small fixed number of POSIX
/// syscalls on the real backend. The rest of `nfs4d` (compound engine,
/// journal replay, recovery) never touches `std::fs` directly; it goes
/// through this trait so a fully in-memory backend can stand in for tests
/// without sacrificing the same call shape.
///
/// Implementations must be `Send + Sync`: the server dispatches compound
/// ops from multiple connection worker threads concurrently.
pub trait FilesystemOracle: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    /// Exclusive create of a regular file. Fails [`crate::FsError::AlreadyExists`]
    /// if `path` already exists -- callers that need idempotent replay
    /// semantics (journal redo) catch that case themselves.
    fn create_file(&self, path: &Path, mode: u32) -> FsResult<()>;

    fn mkdir(&self, path: &Path, mode: u32) -> FsResult<()>;

    /// Exclusive create of a symlink at `link_path` pointing at `target`.
    fn symlink(&self, target: &str, link_path: &Path) -> FsResult<()>;

    fn readlink(&self, path: &Path) -> FsResult<String>;

    fn remove_file(&self, path: &Path) -> FsResult<()>;

    /// Fails [`crate::FsError::NotEmpty`] if the directory has entries.
    fn rmdir(&self, path: &Path) -> FsResult<()>;

    /// Fails [`crate::FsError::CrossDevice`] if `old` and `new` resolve to
    /// different backing devices.
    fn rename(&self, old: &Path, new: &Path) -> FsResult<()>;

    /// Returns `(data, eof)` where `eof` is true iff the read reached the
    /// current end of file.
    fn read(&self, path: &Path, offset: u64, count: u32) -> FsResult<(Vec<u8>, bool)>;

    /// Returns `(bytes_written, committed)`. `committed` is `true` iff
    /// `stable` was requested and the write was fsynced before returning.
    fn write(&self, path: &Path, offset: u64, data: &[u8], stable: bool) -> FsResult<(u32, bool)>;

    fn getattr(&self, path: &Path) -> FsResult<OracleAttrs>;

    fn setattr(&self, path: &Path, change: &AttrChange) -> FsResult<OracleAttrs>;

    /// Resumable directory listing. `cookie` of `0` starts from the
    /// beginning. Returns entries whose cumulative encoded size does not
    /// exceed `maxcount`, and an EOF bit.
    fn readdir(&self, path: &Path, cookie: u64, maxcount: u32) -> FsResult<(Vec<DirEntry>, bool)>;

    /// Read a file's entire contents, used to capture WAL pre-state before
    /// a WRITE/SETATTR mutation.
    fn read_full(&self, path: &Path) -> FsResult<Vec<u8>>;

    /// Overwrite a file's entire contents, used to restore WAL pre-state
    /// on rollback/undo.
    fn write_full(&self, path: &Path, data: &[u8]) -> FsResult<()>;

    fn fsync(&self, path: &Path) -> FsResult<()>;
}
