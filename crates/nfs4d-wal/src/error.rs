use std::io;

use thiserror::Error;

/// Errors from the write-ahead transaction log.
#[derive(Debug, Error)]
pub enum WalError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("unknown transaction id {0}")]
    UnknownTxn(u64),

    #[error("transaction {0} already committed")]
    AlreadyCommitted(u64),
}

pub type WalResult<T> = Result<T, WalError>;
