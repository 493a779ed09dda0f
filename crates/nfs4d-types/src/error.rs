use thiserror::Error;

/// Errors produced by type-level conversions and codec primitives.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("encoding error: {0}")]
    BadEncoding(String),
}
