use serde::{Deserialize, Serialize};

use nfs4d_types::{MutatingProcedure, Timestamp};

use crate::entry::JournalOutcome;

/// One append-only record in the journal's on-disk log. A `JournalEntry`
/// accumulates an `Append`, zero or more `Dependency` records, and a
/// terminal `Complete`; an entry with no `Complete` record is incomplete.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum JournalRecord {
    Append {
        seq_id: u64,
        txn_id: u64,
        procedure: MutatingProcedure,
        args: Vec<u8>,
        target_path: String,
        timestamp: Timestamp,
        client_id: Option<String>,
    },
    Dependency {
        seq_id: u64,
        depends_on: u64,
    },
    Complete {
        seq_id: u64,
        result: JournalOutcome,
    },
}

impl JournalRecord {
    pub fn seq_id(&self) -> u64 {
        match self {
            JournalRecord::Append { seq_id, .. } => *seq_id,
            JournalRecord::Dependency { seq_id, .. } => *seq_id,
            JournalRecord::Complete { seq_id, .. } => *seq_id,
        }
    }
}
