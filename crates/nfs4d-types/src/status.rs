use serde::{Deserialize, Serialize};

/// NFSv4 status codes the core understands.
///
/// This is not the full protocol status set, only the subset the
/// compound engine, auth gate, lock manager, and recovery engine
/// actually produce.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
#[repr(i32)]
pub enum NfsStatus {
    Ok = 0,
    Perm = 1,
    Noent = 2,
    Io = 5,
    Access = 13,
    Exist = 17,
    Xdev = 18,
    Notdir = 20,
    Isdir = 21,
    Inval = 22,
    Nospc = 28,
    Nametoolong = 63,
    Notempty = 66,
    Stale = 70,
    Badhandle = 10001,
    Notsupp = 10004,
    Serverfault = 10006,
    Delay = 10008,
    Locked = 10012,
    Grace = 10013,
    ClidInuse = 10017,
    StaleClientid = 10022,
    StaleStateid = 10023,
    BadSeqid = 10026,
    NoGrace = 10033,
    ReclaimBad = 10034,
    ReclaimConflict = 10035,
    LockRange = 10028,
    LockNotsupp = 10029,
    Deadlock = 10045,
    FileOpen = 10046,
    NoFileHandle = 10020,
    RestoreFh = 10030,
    SeqMisordered = 10063,
    AuthError = 10042,
}

impl NfsStatus {
    /// `true` for the single success status.
    pub fn is_ok(&self) -> bool {
        matches!(self, NfsStatus::Ok)
    }

    /// Map a POSIX `errno` (as surfaced by `std::io::Error::raw_os_error`)
    /// to the matching status, per the filesystem error table.
    pub fn from_errno(errno: i32) -> Self {
        match errno {
            libc_eexist if libc_eexist == EEXIST => NfsStatus::Exist,
            libc_enotempty if libc_enotempty == ENOTEMPTY => NfsStatus::Notempty,
            libc_eacces if libc_eacces == EACCES => NfsStatus::Access,
            libc_exdev if libc_exdev == EXDEV => NfsStatus::Xdev,
            libc_enoent if libc_enoent == ENOENT => NfsStatus::Noent,
            libc_enotdir if libc_enotdir == ENOTDIR => NfsStatus::Notdir,
            libc_eisdir if libc_eisdir == EISDIR => NfsStatus::Isdir,
            libc_enospc if libc_enospc == ENOSPC => NfsStatus::Nospc,
            libc_enametoolong if libc_enametoolong == ENAMETOOLONG => NfsStatus::Nametoolong,
            libc_eperm if libc_eperm == EPERM => NfsStatus::Perm,
            _ => NfsStatus::Io,
        }
    }

    /// Map from a [`std::io::Error`] directly.
    pub fn from_io_error(err: &std::io::Error) -> Self {
        match err.raw_os_error() {
            Some(errno) => Self::from_errno(errno),
            None => NfsStatus::Io,
        }
    }
}

// Portable errno constants (avoids pulling in `libc` for a handful of
// well-known values; these match Linux/BSD/Darwin).
const EPERM: i32 = 1;
const ENOENT: i32 = 2;
const EACCES: i32 = 13;
const EEXIST: i32 = 17;
const EXDEV: i32 = 18;
const ENOTDIR: i32 = 20;
const EISDIR: i32 = 21;
const ENOSPC: i32 = 28;
const ENOTEMPTY: i32 = 39;
const ENAMETOOLONG: i32 = 36;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_errnos() {
        assert_eq!(NfsStatus::from_errno(EEXIST), NfsStatus::Exist);
        assert_eq!(NfsStatus::from_errno(ENOTEMPTY), NfsStatus::Notempty);
        assert_eq!(NfsStatus::from_errno(EACCES), NfsStatus::Access);
        assert_eq!(NfsStatus::from_errno(EXDEV), NfsStatus::Xdev);
    }

    #[test]
    fn unknown_errno_maps_to_io() {
        assert_eq!(NfsStatus::from_errno(9999), NfsStatus::Io);
    }
}
