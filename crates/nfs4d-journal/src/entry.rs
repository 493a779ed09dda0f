use serde::{Deserialize, Serialize};

use nfs4d_types::{MutatingProcedure, Timestamp};

/// The outcome recorded by [`crate::Journal::complete`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum JournalOutcome {
    Success,
    Failed(String),
}

/// One journaled high-level operation, paired 1:1 with a WAL transaction
/// by `txn_id`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JournalEntry {
    pub seq_id: u64,
    pub txn_id: u64,
    pub procedure: MutatingProcedure,
    pub args: Vec<u8>,
    pub deps: Vec<u64>,
    pub target_path: String,
    pub timestamp: Timestamp,
    pub completed: bool,
    pub result: Option<JournalOutcome>,
    /// The client this entry belongs to, if any -- used by the recovery
    /// engine's per-client reconnect replay to select a client's subset
    /// of the journal.
    pub client_id: Option<String>,
}
