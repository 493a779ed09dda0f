use thiserror::Error;

/// Errors from the lock manager. Most outcomes (conflict, deadlock,
/// timeout) are represented as [`crate::LockOutcome`] values, not errors
/// -- they are expected results of concurrent use, not failures. This
/// enum is reserved for genuine invariant violations.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("lock manager poisoned")]
    Poisoned,
}

pub type LockResult<T> = Result<T, LockError>;
