//! The write-ahead transaction log.
//!
//! Every non-idempotent filesystem mutation the compound engine performs
//! is bracketed by a WAL transaction: [`TransactionLog::begin`] records
//! the procedure and its arguments, an optional
//! [`TransactionLog::save_pre_state`] attaches the bytes needed to undo
//! the effect, and [`TransactionLog::commit`] forces the outcome to
//! stable storage before the caller's reply goes out. The journal crate
//! layers ordering and idempotent replay on top of this durability
//! primitive; this crate only answers "did this transaction commit".

pub mod error;
pub mod record;
pub mod wal;

pub use error::{WalError, WalResult};
pub use record::{UncommittedTxn, WalRecord};
pub use wal::TransactionLog;
