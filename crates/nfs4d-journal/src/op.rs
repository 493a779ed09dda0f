use serde::{Deserialize, Serialize};

use nfs4d_fs::{AttrChange, FilesystemOracle, FsError, FsResult};
use nfs4d_types::{MutatingProcedure, NfsFileType};

/// The decoded, typed form of a journal entry's `args` bytes: everything
/// [`crate::replay`] needs to re-apply a mutating operation against a
/// [`FilesystemOracle`] without the caller reconstructing it by hand.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum MutatingOp {
    Create {
        path: String,
        file_type: NfsFileType,
        mode: u32,
    },
    Remove {
        path: String,
    },
    Write {
        path: String,
        offset: u64,
        data: Vec<u8>,
        stable: bool,
    },
    SetAttr {
        path: String,
        change: AttrChange,
    },
    Rename {
        old: String,
        new: String,
    },
    Mkdir {
        path: String,
        mode: u32,
    },
    Rmdir {
        path: String,
    },
    Symlink {
        target: String,
        link_path: String,
    },
}

impl MutatingOp {
    pub fn procedure(&self) -> MutatingProcedure {
        match self {
            MutatingOp::Create { .. } => MutatingProcedure::Create,
            MutatingOp::Remove { .. } => MutatingProcedure::Remove,
            MutatingOp::Write { .. } => MutatingProcedure::Write,
            MutatingOp::SetAttr { .. } => MutatingProcedure::SetAttr,
            MutatingOp::Rename { .. } => MutatingProcedure::Rename,
            MutatingOp::Mkdir { .. } => MutatingProcedure::Mkdir,
            MutatingOp::Rmdir { .. } => MutatingProcedure::Rmdir,
            MutatingOp::Symlink { .. } => MutatingProcedure::Symlink,
        }
    }

    /// The path this op targets, used as the journal entry's
    /// `target_path` for per-path temporal ordering.
    pub fn target_path(&self) -> &str {
        match self {
            MutatingOp::Create { path, .. } => path,
            MutatingOp::Remove { path } => path,
            MutatingOp::Write { path, .. } => path,
            MutatingOp::SetAttr { path, .. } => path,
            // The destination directory is what subsequent ops on the
            // renamed path will reference.
            MutatingOp::Rename { new, .. } => new,
            MutatingOp::Mkdir { path, .. } => path,
            MutatingOp::Rmdir { path } => path,
            MutatingOp::Symlink { link_path, .. } => link_path,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        bincode::serialize(self).expect("MutatingOp always encodes")
    }

    pub fn decode(bytes: &[u8]) -> JournalDecodeResult<Self> {
        bincode::deserialize(bytes).map_err(|e| e.to_string())
    }

    /// Apply this op to `fs`, tolerating the "already applied" final
    /// state per the §4.4 idempotency contract so replay of a completed
    /// op is safe to repeat.
    pub fn apply_idempotent(&self, fs: &dyn FilesystemOracle) -> FsResult<()> {
        use std::path::Path;

        match self {
            MutatingOp::Create { path, mode, .. } => {
                let path = Path::new(path);
                match fs.create_file(path, *mode) {
                    Ok(()) | Err(FsError::AlreadyExists(_)) => Ok(()),
                    Err(e) => Err(e),
                }
            }
            MutatingOp::Remove { path } => {
                let path = Path::new(path);
                match fs.remove_file(path) {
                    Ok(()) | Err(FsError::NotFound(_)) => Ok(()),
                    Err(e) => Err(e),
                }
            }
            MutatingOp::Write {
                path,
                offset,
                data,
                stable,
            } => {
                fs.write(Path::new(path), *offset, data, *stable)?;
                Ok(())
            }
            MutatingOp::SetAttr { path, change } => {
                fs.setattr(Path::new(path), change)?;
                Ok(())
            }
            MutatingOp::Rename { old, new } => {
                match fs.rename(Path::new(old), Path::new(new)) {
                    Ok(()) => Ok(()),
                    // The rename already landed: `old` is gone and `new`
                    // exists in its place.
                    Err(FsError::NotFound(_)) if fs.exists(Path::new(new)) => Ok(()),
                    Err(e) => Err(e),
                }
            }
            MutatingOp::Mkdir { path, mode } => {
                let path = Path::new(path);
                match fs.mkdir(path, *mode) {
                    Ok(()) | Err(FsError::AlreadyExists(_)) => Ok(()),
                    Err(e) => Err(e),
                }
            }
            MutatingOp::Rmdir { path } => {
                let path = Path::new(path);
                match fs.rmdir(path) {
                    Ok(()) | Err(FsError::NotFound(_)) => Ok(()),
                    Err(e) => Err(e),
                }
            }
            MutatingOp::Symlink { target, link_path } => {
                let link_path = Path::new(link_path);
                match fs.symlink(target, link_path) {
                    Ok(()) | Err(FsError::AlreadyExists(_)) => Ok(()),
                    Err(e) => Err(e),
                }
            }
        }
    }
}

pub type JournalDecodeResult<T> = Result<T, String>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bytes() {
        let op = MutatingOp::Write {
            path: "/a".into(),
            offset: 0,
            data: vec![1, 2, 3],
            stable: true,
        };
        let bytes = op.encode();
        let decoded = MutatingOp::decode(&bytes).unwrap();
        assert!(matches!(decoded, MutatingOp::Write { offset: 0, .. }));
    }
}
