use serde::{Deserialize, Serialize};

/// GETATTR/SETATTR attribute bitmap values (wire-facing).
pub mod bitmap {
    pub const TYPE: u32 = 0x01;
    pub const MODE: u32 = 0x02;
    pub const NLINK: u32 = 0x04;
    pub const OWNER: u32 = 0x08;
    pub const GROUP: u32 = 0x10;
    pub const SIZE: u32 = 0x20;
    pub const USED: u32 = 0x40;
    pub const FSID: u32 = 0x80;
    pub const FILEID: u32 = 0x100;
    pub const ATIME: u32 = 0x200;
    pub const MTIME: u32 = 0x400;
    pub const CTIME: u32 = 0x800;
}

/// WAL-internal SETATTR mask, distinct from the wire [`bitmap`] above.
pub mod setattr_mask {
    pub const MODE: u32 = 1;
    pub const UID: u32 = 2;
    pub const GID: u32 = 4;
    pub const SIZE: u32 = 8;
    pub const ATIME: u32 = 16;
    pub const MTIME: u32 = 32;
}

/// File type as reported in `type` attribute.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub enum NfsFileType {
    Reg,
    Dir,
    Lnk,
    Blk,
    Chr,
    Sock,
    Fifo,
}

/// The subset of POSIX attributes the server tracks and can report via
/// GETATTR / apply via SETATTR, selected by [`bitmap`].
#[derive(Clone, PartialEq, Serialize, Deserialize, Debug, Default)]
pub struct Fattr4 {
    pub file_type: Option<NfsFileType>,
    pub mode: Option<u32>,
    pub nlink: Option<u32>,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub size: Option<u64>,
    pub used: Option<u64>,
    pub fsid: Option<u64>,
    pub fileid: Option<u64>,
    pub atime_secs: Option<u64>,
    pub mtime_secs: Option<u64>,
    pub ctime_secs: Option<u64>,
}

impl Fattr4 {
    /// Restrict the attribute set to those selected by `mask` (a bitwise
    /// OR of [`bitmap`] constants), clearing the rest.
    pub fn masked(mut self, mask: u32) -> Self {
        if mask & bitmap::TYPE == 0 {
            self.file_type = None;
        }
        if mask & bitmap::MODE == 0 {
            self.mode = None;
        }
        if mask & bitmap::NLINK == 0 {
            self.nlink = None;
        }
        if mask & bitmap::OWNER == 0 {
            self.uid = None;
        }
        if mask & bitmap::GROUP == 0 {
            self.gid = None;
        }
        if mask & bitmap::SIZE == 0 {
            self.size = None;
        }
        if mask & bitmap::USED == 0 {
            self.used = None;
        }
        if mask & bitmap::FSID == 0 {
            self.fsid = None;
        }
        if mask & bitmap::FILEID == 0 {
            self.fileid = None;
        }
        if mask & bitmap::ATIME == 0 {
            self.atime_secs = None;
        }
        if mask & bitmap::MTIME == 0 {
            self.mtime_secs = None;
        }
        if mask & bitmap::CTIME == 0 {
            self.ctime_secs = None;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masked_keeps_only_selected_fields() {
        let attr = Fattr4 {
            size: Some(5),
            mode: Some(0o644),
            ..Default::default()
        };
        let masked = attr.masked(bitmap::SIZE);
        assert_eq!(masked.size, Some(5));
        assert_eq!(masked.mode, None);
    }
}
