use thiserror::Error;

/// Errors from credential verification and authorization (§4.8).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("malformed SYS credential: {0}")]
    BadCredential(String),

    #[error("unsupported credential flavor {0}")]
    UnsupportedFlavor(u32),

    #[error("GSS context is not established")]
    ContextNotEstablished,

    #[error("GSS context id is unknown")]
    UnknownContext,

    #[error("MIC is missing from a call made on an established context")]
    MicMissing,

    #[error("MIC verification failed")]
    MicMismatch,
}

pub type AuthResult<T> = Result<T, AuthError>;
