use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use nfs4d_fs::FilesystemOracle;
use nfs4d_journal::{JournalOutcome, MutatingOp, OperationJournal};
use nfs4d_types::{MutatingProcedure, RecoveryPhase};
use nfs4d_wal::{TransactionLog, UncommittedTxn};

use crate::consistency::ConsistencyManager;
use crate::error::{RecoveryError, RecoveryResult};
use crate::metrics::RecoveryMetrics;

/// Summary of one [`CrashRecovery::run`] pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CrashRecoveryReport {
    pub redone: usize,
    pub undone: usize,
    /// The distinct client ids that had outstanding work at crash time,
    /// handed to the grace-period manager as the set that must reclaim
    /// before the server admits their non-reclaim traffic.
    pub affected_clients: Vec<String>,
}

/// Scans the WAL and journal for work left incomplete by a crash, redoes
/// or undoes each entry per the idempotent-replay contract, verifies the
/// result, and truncates both logs once every entry is resolved (§4.11).
pub struct CrashRecovery {
    wal: Arc<TransactionLog>,
    journal: Arc<dyn OperationJournal>,
    fs: Arc<dyn FilesystemOracle>,
    metrics: Arc<RecoveryMetrics>,
    consistency: Arc<ConsistencyManager>,
}

impl CrashRecovery {
    pub fn new(
        wal: Arc<TransactionLog>,
        journal: Arc<dyn OperationJournal>,
        fs: Arc<dyn FilesystemOracle>,
        metrics: Arc<RecoveryMetrics>,
        consistency: Arc<ConsistencyManager>,
    ) -> Self {
        Self {
            wal,
            journal,
            fs,
            metrics,
            consistency,
        }
    }

    pub fn run(&self) -> RecoveryResult<CrashRecoveryReport> {
        self.metrics.record_crash_recovery_run();

        // Scan.
        let uncommitted: HashMap<u64, UncommittedTxn> = self
            .wal
            .recover()?
            .into_iter()
            .map(|txn| (txn.txn_id, txn))
            .collect();
        let ordered = self.journal.recover()?;
        info!(
            incomplete = ordered.len(),
            uncommitted_txns = uncommitted.len(),
            "crash recovery: scan complete"
        );

        // Analyze + Restore: redo or undo each entry, in the journal's
        // replay order.
        let mut redone = 0usize;
        let mut undone = 0usize;
        let mut affected_clients: HashSet<String> = HashSet::new();
        let mut fatal: Vec<String> = Vec::new();
        let mut applied: Vec<(u64, String, MutatingProcedure)> = Vec::new();

        for entry in &ordered {
            if let Some(client_id) = &entry.client_id {
                affected_clients.insert(client_id.clone());
            }

            let op = MutatingOp::decode(&entry.args).map_err(|reason| RecoveryError::Decode {
                seq_id: entry.seq_id,
                reason,
            })?;

            // A txn still in the uncommitted WAL set never reached the
            // durability point its journal entry claims: if it has a saved
            // pre-state, the transaction is rolled back outright rather than
            // pushed forward, even when blindly redoing it would also
            // succeed. Redo is only attempted for a committed txn (absent
            // from `uncommitted`) or one that never captured a pre-state to
            // begin with, i.e. an op class that is idempotent-redoable by
            // construction (Create, Mkdir, ...).
            let saved_pre_state = uncommitted.get(&entry.txn_id).and_then(|txn| txn.pre_state.clone());

            match saved_pre_state {
                Some(bytes) => {
                    warn!(
                        seq = entry.seq_id,
                        txn = entry.txn_id,
                        "txn uncommitted at crash time; undoing from WAL pre-state"
                    );
                    self.fs.write_full(Path::new(&entry.target_path), &bytes)?;
                    self.journal.rollback_state_transition(entry.seq_id)?;
                    self.journal.complete(
                        entry.seq_id,
                        JournalOutcome::Failed("txn uncommitted at crash time".to_string()),
                    )?;
                    self.metrics.record_undo();
                    undone += 1;
                }
                None => match op.apply_idempotent(self.fs.as_ref()) {
                    Ok(()) => {
                        self.journal.complete(entry.seq_id, JournalOutcome::Success)?;
                        self.metrics.record_redo();
                        redone += 1;
                        applied.push((entry.seq_id, entry.target_path.clone(), entry.procedure));
                    }
                    Err(apply_err) => {
                        warn!(
                            seq = entry.seq_id,
                            error = %apply_err,
                            "redo failed with no pre-state to undo from"
                        );
                        self.journal.complete(
                            entry.seq_id,
                            JournalOutcome::Failed(apply_err.to_string()),
                        )?;
                        self.metrics.record_failed();
                        fatal.push(format!(
                            "seq {} ({:?} on {}): {apply_err}",
                            entry.seq_id, entry.procedure, entry.target_path
                        ));
                    }
                },
            }
        }

        // Verify: every successfully-applied create-class op must exist,
        // every remove-class op must not.
        for (seq_id, path, procedure) in &applied {
            let should_exist = !matches!(procedure, MutatingProcedure::Remove | MutatingProcedure::Rmdir);
            let exists = self.fs.exists(Path::new(path));
            if exists != should_exist {
                fatal.push(format!(
                    "seq {seq_id}: post-replay verify mismatch on {path} (expected exists={should_exist}, got {exists})"
                ));
            }
        }
        self.consistency.record_point(RecoveryPhase::Verify);

        if !fatal.is_empty() {
            return Err(RecoveryError::FatalConsistency(fatal.join("; ")));
        }

        // Complete: every entry this pass saw is now resolved one way or
        // another, so the logs can be truncated.
        self.journal.compact(&[])?;
        self.wal.compact(&[])?;

        Ok(CrashRecoveryReport {
            redone,
            undone,
            affected_clients: affected_clients.into_iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nfs4d_fs::InMemoryFilesystem;
    use nfs4d_journal::Journal;
    use nfs4d_types::NfsFileType;
    use tempfile::tempdir;

    fn harness(dir: &Path) -> (Arc<TransactionLog>, Arc<dyn OperationJournal>, Arc<dyn FilesystemOracle>) {
        let wal = Arc::new(TransactionLog::open(&dir.join("wal")).unwrap());
        let journal: Arc<dyn OperationJournal> =
            Arc::new(Journal::open(&dir.join("journal"), wal.clone()).unwrap());
        let fs: Arc<dyn FilesystemOracle> = Arc::new(InMemoryFilesystem::new());
        (wal, journal, fs)
    }

    #[test]
    fn redoes_an_incomplete_idempotent_create() {
        let dir = tempdir().unwrap();
        let (wal, journal, fs) = harness(dir.path());
        let op = MutatingOp::Create {
            path: "/a".into(),
            file_type: NfsFileType::Reg,
            mode: 0o644,
        };
        journal.append(&op, Some("c1".into())).unwrap();
        // The create landed on disk before the crash; the journal just
        // never got to mark it complete.
        fs.create_file(Path::new("/a"), 0o644).unwrap();

        let recovery = CrashRecovery::new(
            wal,
            journal.clone(),
            fs.clone(),
            Arc::new(RecoveryMetrics::new()),
            Arc::new(ConsistencyManager::new()),
        );
        let report = recovery.run().unwrap();
        assert_eq!(report.redone, 1);
        assert_eq!(report.undone, 0);
        assert_eq!(report.affected_clients, vec!["c1".to_string()]);
        assert!(journal.get_incomplete().unwrap().is_empty());
    }

    #[test]
    fn undoes_when_redo_fails_and_pre_state_is_available() {
        let dir = tempdir().unwrap();
        let (wal, journal, fs) = harness(dir.path());
        let op = MutatingOp::Write {
            path: "/a".into(),
            offset: 0,
            data: vec![9, 9, 9],
            stable: false,
        };
        let seq = journal.append(&op, None).unwrap();
        journal.begin_state_transition(seq, b"pre".to_vec()).unwrap();
        // "/a" was never created, so the redo (a write to an existing
        // file) fails and recovery must fall back to the saved pre-state.

        let recovery = CrashRecovery::new(
            wal,
            journal.clone(),
            fs.clone(),
            Arc::new(RecoveryMetrics::new()),
            Arc::new(ConsistencyManager::new()),
        );
        let report = recovery.run().unwrap();
        assert_eq!(report.undone, 1);
        assert_eq!(fs.read_full(Path::new("/a")).unwrap(), b"pre");
    }
}
