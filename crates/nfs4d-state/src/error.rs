use thiserror::Error;

/// Errors from the client/lease/state registry (§4.6).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("client id already registered with a different verifier")]
    ClientIdInUse,
    #[error("unknown client id")]
    UnknownClient,
    #[error("client is not confirmed")]
    NotConfirmed,
    #[error("client lease has expired")]
    LeaseExpired,
    #[error("no matching state object")]
    UnknownState,
}

pub type StateResult<T> = Result<T, StateError>;
