use nfs4d_fs::{AttrChange, DirEntry};
use nfs4d_types::{Fattr4, FileHandle, NfsFileType, NfsOp, NfsStatus};

/// One decoded compound operation, already typed -- the RPC frontend is
/// responsible for turning wire bytes into these; this crate never
/// touches XDR directly.
#[derive(Clone, Debug)]
pub enum CompoundOp {
    PutFh { handle: FileHandle },
    PutRootFh,
    GetFh,
    SaveFh,
    RestoreFh,
    Lookup { name: String },
    GetAttr { mask: u32 },
    SetAttr { change: AttrChange },
    Create { name: String, file_type: NfsFileType, mode: u32 },
    Remove { name: String },
    Rename { old_name: String, new_name: String },
    Read { offset: u64, count: u32 },
    Write { offset: u64, data: Vec<u8>, stable: bool },
    ReadDir { cookie: u64, maxcount: u32 },
    ReadLink,
    Symlink { name: String, target: String },
    SetClientId { client_id: String, verifier: Vec<u8> },
    SetClientIdConfirm { client_id: String },
    CreateSession { client_id: String },
    DestroySession { session_id: u32 },
    Sequence { session_id: u32, seq_id: u32 },
    ReclaimComplete,
}

impl CompoundOp {
    pub fn opcode(&self) -> NfsOp {
        match self {
            CompoundOp::PutFh { .. } => NfsOp::PutFh,
            CompoundOp::PutRootFh => NfsOp::PutRootFh,
            CompoundOp::GetFh => NfsOp::GetFh,
            CompoundOp::SaveFh => NfsOp::SaveFh,
            CompoundOp::RestoreFh => NfsOp::RestoreFh,
            CompoundOp::Lookup { .. } => NfsOp::Lookup,
            CompoundOp::GetAttr { .. } => NfsOp::GetAttr,
            CompoundOp::SetAttr { .. } => NfsOp::SetAttr,
            CompoundOp::Create { .. } => NfsOp::Create,
            CompoundOp::Remove { .. } => NfsOp::Remove,
            CompoundOp::Rename { .. } => NfsOp::Rename,
            CompoundOp::Read { .. } => NfsOp::Read,
            CompoundOp::Write { .. } => NfsOp::Write,
            CompoundOp::ReadDir { .. } => NfsOp::ReadDir,
            CompoundOp::ReadLink => NfsOp::ReadLink,
            CompoundOp::Symlink { .. } => NfsOp::Symlink,
            CompoundOp::SetClientId { .. } => NfsOp::SetClientId,
            CompoundOp::SetClientIdConfirm { .. } => NfsOp::SetClientIdConfirm,
            CompoundOp::CreateSession { .. } => NfsOp::CreateSession,
            CompoundOp::DestroySession { .. } => NfsOp::DestroySession,
            CompoundOp::Sequence { .. } => NfsOp::Sequence,
            CompoundOp::ReclaimComplete => NfsOp::ReclaimComplete,
        }
    }
}

/// The payload a successfully executed op produced. Ops with nothing to
/// report (`PUTFH`, `REMOVE`, ...) use `Void`.
#[derive(Clone, Debug)]
pub enum OpResult {
    Void,
    Handle(FileHandle),
    Attrs(Fattr4),
    Read { data: Vec<u8>, eof: bool },
    Write { count: u32, committed: bool },
    ReadDir { entries: Vec<DirEntry>, eof: bool },
    ReadLink { target: String },
    ClientId,
    Session { session_id: u32 },
}

/// One op's outcome inside a [`crate::CompoundReply`]: the opcode it was
/// dispatched for, the status it returned, and its payload if the
/// status was `Ok`.
#[derive(Clone, Debug)]
pub struct ExecutedOp {
    pub opcode: NfsOp,
    pub status: NfsStatus,
    pub result: Option<OpResult>,
}

/// The full compound reply: the echoed tag, the overall status (the
/// first non-`Ok` op's status, or `Ok` if every op succeeded), and the
/// prefix of ops actually executed.
#[derive(Clone, Debug)]
pub struct CompoundReply {
    pub tag: String,
    pub status: NfsStatus,
    pub results: Vec<ExecutedOp>,
}
