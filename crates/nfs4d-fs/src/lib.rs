//! The local-filesystem oracle: the storage backend the rest of `nfs4d`
//! treats as ground truth.
//!
//! Everything above this crate -- the compound engine, the WAL's pre-state
//! capture, the journal's idempotent replay -- talks to the filesystem only
//! through [`FilesystemOracle`]. [`LocalFilesystem`] is the real backend,
//! issuing the POSIX syscalls this project's scope statement treats as an
//! external oracle; [`InMemoryFilesystem`] is a test double with the same
//! call shape.

pub mod entry;
pub mod error;
pub mod local;
pub mod memory;
pub mod traits;

pub use entry::{AttrChange, DirEntry, OracleAttrs};
pub use error::{FsError, FsResult};
pub use local::LocalFilesystem;
pub use memory::InMemoryFilesystem;
pub use traits::FilesystemOracle;
