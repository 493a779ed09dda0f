use serde::{Deserialize, Serialize};

use nfs4d_types::{MutatingProcedure, Timestamp};

/// One append-only WAL record. A transaction accumulates a `Begin`, an
/// optional `PreState`, and a terminal `Commit` in that order; a
/// transaction with no `Commit` record is uncommitted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum WalRecord {
    Begin {
        txn_id: u64,
        procedure: MutatingProcedure,
        args: Vec<u8>,
        timestamp: Timestamp,
    },
    PreState {
        txn_id: u64,
        pre_state: Vec<u8>,
        timestamp: Timestamp,
    },
    Commit {
        txn_id: u64,
        timestamp: Timestamp,
    },
}

impl WalRecord {
    pub fn txn_id(&self) -> u64 {
        match self {
            WalRecord::Begin { txn_id, .. } => *txn_id,
            WalRecord::PreState { txn_id, .. } => *txn_id,
            WalRecord::Commit { txn_id, .. } => *txn_id,
        }
    }
}

/// A transaction the log observed a `Begin` for but no `Commit`, returned
/// by [`crate::TransactionLog::recover`] for the journal's redo/undo
/// analysis.
#[derive(Clone, Debug)]
pub struct UncommittedTxn {
    pub txn_id: u64,
    pub procedure: MutatingProcedure,
    pub args: Vec<u8>,
    pub pre_state: Option<Vec<u8>>,
    pub timestamp: Timestamp,
}
