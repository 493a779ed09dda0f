use thiserror::Error;

/// Errors from handle-id derivation and MIC primitives.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// The handle table generated a colliding identifier. At 128 bits of
    /// CSPRNG entropy this is practically unreachable; it is checked
    /// rather than assumed, per the handle table's fatal-on-collision
    /// invariant.
    #[error("handle id collision detected")]
    HandleIdCollision,

    #[error("MIC verification failed")]
    MicMismatch,
}
