use thiserror::Error;

/// Errors from the recovery engine's three modes: crash recovery,
/// grace-period reclaim, and session reconnect replay.
#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error(transparent)]
    Wal(#[from] nfs4d_wal::WalError),

    #[error(transparent)]
    Journal(#[from] nfs4d_journal::JournalError),

    #[error(transparent)]
    Fs(#[from] nfs4d_fs::FsError),

    #[error("failed to decode journal entry {seq_id}'s args: {reason}")]
    Decode { seq_id: u64, reason: String },

    #[error("consistency check failed after replay: {0}")]
    FatalConsistency(String),

    #[error("entry {seq_id} exhausted its retry budget after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        seq_id: u64,
        attempts: u32,
        last_error: String,
    },
}

pub type RecoveryResult<T> = Result<T, RecoveryError>;
