use thiserror::Error;

/// Errors surfaced by the wire codec and frontend dispatch (§4.9).
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed wire encoding: {0}")]
    BadEncoding(String),

    #[error("unknown program {0}")]
    ProgUnavail(u32),

    #[error("unknown procedure {0} for program {1}")]
    ProcUnavail(u32, u32),

    #[error("argument decode failure: {0}")]
    GarbageArgs(String),

    #[error("authentication failed")]
    AuthError,

    #[error("internal error while handling the call: {0}")]
    SystemErr(String),
}

pub type RpcResult<T> = Result<T, RpcError>;
