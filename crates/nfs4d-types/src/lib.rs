//! Foundation types shared by every `nfs4d` crate.
//!
//! This crate holds the wire/data-model primitives the rest of the server
//! builds on: the opaque [`FileHandle`], the NFSv4 [`status::NfsStatus`]
//! codes, the [`opcode::NfsOp`] / [`opcode::NfsProcedure`] discriminants, the
//! GETATTR/SETATTR attribute bitmaps in [`attr`], the advisory [`lock::LockKind`]
//! flavor, and the [`temporal::Timestamp`] used for lease/session/lock
//! bookkeeping. Nothing here touches the filesystem, the network, or any
//! other crate's state; it is pure data plus the conversions errors need.

pub mod attr;
pub mod error;
pub mod handle;
pub mod lock;
pub mod opcode;
pub mod replay;
pub mod status;
pub mod temporal;

pub use attr::{bitmap, setattr_mask, Fattr4, NfsFileType};
pub use error::TypeError;
pub use handle::{FileHandle, HANDLE_LEN};
pub use lock::LockKind;
pub use opcode::{MutatingProcedure, NfsOp, NfsProcedure, NFS_V4, PROGRAM_MOUNT, PROGRAM_NFS};
pub use replay::{RecoveryPhase, ReplayPriority};
pub use status::NfsStatus;
pub use temporal::Timestamp;
