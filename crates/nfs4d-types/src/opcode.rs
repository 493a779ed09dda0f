use serde::{Deserialize, Serialize};

/// Top-level RPC procedure numbers the frontend accepts.
///
/// For `program = NFS` the only procedure handled by the core is
/// `Compound`; for `program = MOUNT` only `Null` and `Mnt` are accepted.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub enum NfsProcedure {
    Null,
    Compound,
    Mnt,
}

/// RPC program numbers the frontend recognizes.
pub const PROGRAM_NFS: u32 = 100_003;
pub const PROGRAM_MOUNT: u32 = 100_005;
pub const NFS_V4: u32 = 4;

impl NfsProcedure {
    pub fn from_program_and_number(program: u32, number: u32) -> Option<Self> {
        match (program, number) {
            (PROGRAM_NFS, 0) => Some(NfsProcedure::Null),
            (PROGRAM_NFS, 1) => Some(NfsProcedure::Compound),
            (PROGRAM_MOUNT, 0) => Some(NfsProcedure::Null),
            (PROGRAM_MOUNT, 3) => Some(NfsProcedure::Mnt),
            _ => None,
        }
    }
}

/// A single operation inside a COMPOUND request.
///
/// Numeric discriminants follow the real NFSv4 opcode space so the wire
/// codec's integer round-trips without a side table.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
#[repr(u32)]
pub enum NfsOp {
    Access = 3,
    Close = 4,
    Commit = 5,
    Create = 6,
    DelegPurge = 7,
    DelegReturn = 8,
    GetAttr = 9,
    GetFh = 10,
    Link = 11,
    Lock = 12,
    Lockt = 13,
    Locku = 14,
    Lookup = 15,
    LookupP = 16,
    Nverify = 17,
    Open = 18,
    OpenAttr = 19,
    OpenConfirm = 20,
    OpenDowngrade = 21,
    PutFh = 22,
    PutPubFh = 23,
    PutRootFh = 24,
    Read = 25,
    ReadDir = 26,
    ReadLink = 27,
    Remove = 28,
    Rename = 29,
    Renew = 30,
    RestoreFh = 31,
    SaveFh = 32,
    SecInfo = 33,
    SetAttr = 34,
    SetClientId = 35,
    SetClientIdConfirm = 36,
    Verify = 37,
    Write = 38,
    ReleaseLockOwner = 39,
    // Session/4.1-flavored ops this server wires through even though it
    // does not claim full minor-version-1 compliance.
    CreateSession = 43,
    DestroySession = 44,
    Sequence = 53,
    ReclaimComplete = 58,
}

/// Procedures the original-source transaction log replays against the
/// filesystem oracle. Distinct from [`NfsOp`]: a journal entry names one
/// of these, not a raw compound opcode, because only mutating operations
/// are journaled.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub enum MutatingProcedure {
    Create,
    Remove,
    Write,
    SetAttr,
    Rename,
    Mkdir,
    Rmdir,
    Symlink,
}

impl MutatingProcedure {
    /// Whether this procedure's replay is idempotent by "target already
    /// in the desired final state" rather than by value comparison.
    pub fn tolerates_already_applied(&self) -> bool {
        matches!(
            self,
            MutatingProcedure::Create
                | MutatingProcedure::Remove
                | MutatingProcedure::Rename
                | MutatingProcedure::Mkdir
                | MutatingProcedure::Rmdir
                | MutatingProcedure::Symlink
        )
    }
}
