use std::io;

use thiserror::Error;

/// Errors from the operation journal.
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("unknown journal entry seq {0}")]
    UnknownSeq(u64),

    #[error(transparent)]
    Wal(#[from] nfs4d_wal::WalError),

    #[error("dependency cycle detected among journal entries: {0:?}")]
    DependencyCycle(Vec<u64>),

    #[error(transparent)]
    Fs(#[from] nfs4d_fs::FsError),
}

pub type JournalResult<T> = Result<T, JournalError>;
