use thiserror::Error;

/// Errors from the session manager (§4.7).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("unknown session id")]
    UnknownSession,
    #[error("session is not confirmed")]
    NotConfirmed,
    #[error("sequence id {got} is not greater than the last accepted {last}")]
    SeqMisordered { last: u32, got: u32 },
}

pub type SessionResult<T> = Result<T, SessionError>;
