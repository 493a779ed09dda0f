use serde::{Deserialize, Serialize};

use nfs4d_types::NfsFileType;

/// One entry read back from [`crate::FilesystemOracle::readdir`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub file_type: NfsFileType,
    pub fileid: u64,
    /// Opaque resumption cookie for the entry *following* this one.
    pub cookie: u64,
}

/// The POSIX attribute set the oracle can report, independent of the
/// wire-facing [`nfs4d_types::Fattr4`] mask -- the oracle always returns
/// everything it knows; masking happens at the GETATTR/SETATTR call site.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct OracleAttrs {
    pub file_type: Option<NfsFileType>,
    pub mode: u32,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    pub used: u64,
    pub fileid: u64,
    pub atime_secs: u64,
    pub mtime_secs: u64,
    pub ctime_secs: u64,
}

/// Requested attribute changes for [`crate::FilesystemOracle::setattr`],
/// using the wire-facing `setattr_mask` bits from `nfs4d_types::attr`.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct AttrChange {
    pub mask: u32,
    pub mode: Option<u32>,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub size: Option<u64>,
    pub atime_secs: Option<u64>,
    pub mtime_secs: Option<u64>,
}
