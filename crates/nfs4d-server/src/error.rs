use thiserror::Error;

/// Errors from process wiring: configuration, log/storage setup, and
/// startup recovery (§4.12). Everything past startup -- a single
/// connection's protocol errors, a single op's filesystem error -- is
/// handled inline by the RPC frontend and compound engine and never
/// reaches this enum.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transaction log error: {0}")]
    Wal(#[from] nfs4d_wal::WalError),

    #[error("operation journal error: {0}")]
    Journal(#[from] nfs4d_journal::JournalError),

    #[error("recovery failed: {0}")]
    Recovery(#[from] nfs4d_recovery::RecoveryError),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    /// The outer process's exit code for this failure, per §6: 1 for
    /// anything short of a recovery fatal, 2 for that one case.
    pub fn exit_code(&self) -> i32 {
        match self {
            ServerError::Recovery(_) => 2,
            _ => 1,
        }
    }
}
