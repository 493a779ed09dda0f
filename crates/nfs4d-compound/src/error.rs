use thiserror::Error;

/// Internal failures the engine itself can hit outside of a single op's
/// filesystem/state/lock errors -- durability failures from the journal
/// or WAL. Per §7's error taxonomy these always surface to the caller
/// as `NfsStatus::Serverfault`; `CompoundError` exists so the engine has
/// one place to log the underlying cause before throwing it away.
#[derive(Debug, Error)]
pub enum CompoundError {
    #[error("journal error: {0}")]
    Journal(#[from] nfs4d_journal::JournalError),
}

pub type CompoundResult<T> = Result<T, CompoundError>;
