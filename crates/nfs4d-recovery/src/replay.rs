use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use nfs4d_fs::FilesystemOracle;
use nfs4d_journal::{JournalEntry, JournalOutcome, MutatingOp, OperationJournal};
use nfs4d_types::{RecoveryPhase, ReplayPriority};

use crate::consistency::ConsistencyManager;
use crate::error::{RecoveryError, RecoveryResult};
use crate::metrics::RecoveryMetrics;

/// An op that kept failing past its retry budget gets a short pause
/// before the next entry is attempted, so a persistently-broken op
/// cannot busy-loop the replay worker.
const RETRY_BACKOFF: Duration = Duration::from_millis(10);

/// Outcome of one [`ReconnectReplay::replay_for_client`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub replayed: usize,
    pub abandoned: usize,
}

/// Replays one reconnecting client's pending journal entries, batched by
/// [`ReplayPriority`] (metadata ops first, then data, then attributes),
/// flushing a consistency checkpoint every 64 ops or every second of
/// wall-clock replay time, and retrying a failing op up to 3 times
/// before abandoning it (§4.11).
///
/// Unlike [`crate::crash::CrashRecovery`], this never undoes anything:
/// a reconnecting client's own pending ops have no crash-time WAL
/// pre-state to fall back to, so a failing entry is retried, then given
/// up on, never rolled back.
pub struct ReconnectReplay {
    journal: Arc<dyn OperationJournal>,
    fs: Arc<dyn FilesystemOracle>,
    metrics: Arc<RecoveryMetrics>,
    consistency: Arc<ConsistencyManager>,
    max_attempts: u32,
    flush_every: usize,
    flush_interval: Duration,
}

impl ReconnectReplay {
    pub fn new(
        journal: Arc<dyn OperationJournal>,
        fs: Arc<dyn FilesystemOracle>,
        metrics: Arc<RecoveryMetrics>,
        consistency: Arc<ConsistencyManager>,
    ) -> Self {
        Self {
            journal,
            fs,
            metrics,
            consistency,
            max_attempts: 3,
            flush_every: 64,
            flush_interval: Duration::from_secs(1),
        }
    }

    pub fn replay_for_client(&self, client_id: &str) -> RecoveryResult<ReplaySummary> {
        self.metrics.record_reconnect_replay_run();

        let mut remaining: HashMap<u64, JournalEntry> = self
            .journal
            .get_incomplete()?
            .into_iter()
            .filter(|e| e.client_id.as_deref() == Some(client_id))
            .map(|e| (e.seq_id, e))
            .collect();

        let mut attempts: HashMap<u64, u32> = HashMap::new();
        let mut summary = ReplaySummary::default();
        let mut ops_since_checkpoint = 0usize;
        let mut last_checkpoint = Instant::now();

        while !remaining.is_empty() {
            let mut ready: Vec<u64> = Vec::new();
            for &seq in remaining.keys() {
                if self.journal.check_dependencies(seq).unwrap_or(true) {
                    ready.push(seq);
                }
            }

            if ready.is_empty() {
                warn!(
                    client_id,
                    stuck = remaining.len(),
                    "reconnect replay: remaining entries have unresolved dependencies; abandoning"
                );
                for (seq, _) in remaining.drain() {
                    self.journal
                        .complete(seq, JournalOutcome::Failed("unresolved dependency".into()))?;
                    self.metrics.record_reconnect_abandoned();
                    summary.abandoned += 1;
                }
                break;
            }

            ready.sort_by_key(|seq| {
                let entry = &remaining[seq];
                (ReplayPriority::for_procedure(entry.procedure), entry.timestamp, *seq)
            });
            let seq = ready[0];
            let entry = remaining.get(&seq).expect("seq just selected from remaining").clone();

            let op = MutatingOp::decode(&entry.args).map_err(|reason| RecoveryError::Decode {
                seq_id: seq,
                reason,
            })?;

            match op.apply_idempotent(self.fs.as_ref()) {
                Ok(()) => {
                    self.journal.complete(seq, JournalOutcome::Success)?;
                    self.metrics.record_reconnect_op();
                    summary.replayed += 1;
                    remaining.remove(&seq);
                }
                Err(apply_err) => {
                    let count = attempts.entry(seq).or_insert(0);
                    *count += 1;
                    if *count >= self.max_attempts {
                        warn!(seq, client_id, error = %apply_err, attempts = *count, "reconnect replay: abandoning entry");
                        self.journal
                            .complete(seq, JournalOutcome::Failed(apply_err.to_string()))?;
                        self.metrics.record_reconnect_abandoned();
                        summary.abandoned += 1;
                        remaining.remove(&seq);
                    } else {
                        self.metrics.record_reconnect_retry();
                        std::thread::sleep(RETRY_BACKOFF);
                    }
                }
            }

            ops_since_checkpoint += 1;
            if ops_since_checkpoint >= self.flush_every || last_checkpoint.elapsed() >= self.flush_interval {
                self.consistency.record_point(RecoveryPhase::Restore);
                ops_since_checkpoint = 0;
                last_checkpoint = Instant::now();
            }
        }

        info!(
            client_id,
            replayed = summary.replayed,
            abandoned = summary.abandoned,
            "reconnect replay complete"
        );
        self.consistency.record_point(RecoveryPhase::Complete);
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nfs4d_fs::InMemoryFilesystem;
    use nfs4d_journal::Journal;
    use nfs4d_types::NfsFileType;
    use nfs4d_wal::TransactionLog;
    use std::path::Path;
    use tempfile::tempdir;

    fn harness(dir: &Path) -> (Arc<dyn OperationJournal>, Arc<dyn FilesystemOracle>) {
        let wal = Arc::new(TransactionLog::open(&dir.join("wal")).unwrap());
        let journal: Arc<dyn OperationJournal> =
            Arc::new(Journal::open(&dir.join("journal"), wal).unwrap());
        let fs: Arc<dyn FilesystemOracle> = Arc::new(InMemoryFilesystem::new());
        (journal, fs)
    }

    #[test]
    fn replays_only_the_named_clients_entries() {
        let dir = tempdir().unwrap();
        let (journal, fs) = harness(dir.path());
        journal
            .append(
                &MutatingOp::Create {
                    path: "/a".into(),
                    file_type: NfsFileType::Reg,
                    mode: 0o644,
                },
                Some("c1".into()),
            )
            .unwrap();
        journal
            .append(
                &MutatingOp::Create {
                    path: "/b".into(),
                    file_type: NfsFileType::Reg,
                    mode: 0o644,
                },
                Some("c2".into()),
            )
            .unwrap();

        let replay = ReconnectReplay::new(
            journal.clone(),
            fs.clone(),
            Arc::new(RecoveryMetrics::new()),
            Arc::new(ConsistencyManager::new()),
        );
        let summary = replay.replay_for_client("c1").unwrap();
        assert_eq!(summary.replayed, 1);
        assert!(fs.exists(Path::new("/a")));
        assert!(!fs.exists(Path::new("/b")));
        // c2's entry is untouched.
        assert_eq!(journal.get_incomplete().unwrap().len(), 1);
    }

    #[test]
    fn metadata_ops_replay_before_writes() {
        let dir = tempdir().unwrap();
        let (journal, fs) = harness(dir.path());
        // Append the write first so seq_id ordering alone would replay it
        // first; priority must still put the mkdir ahead of it.
        journal
            .append(
                &MutatingOp::Write {
                    path: "/d/f".into(),
                    offset: 0,
                    data: vec![1],
                    stable: false,
                },
                Some("c1".into()),
            )
            .unwrap();
        journal
            .append(
                &MutatingOp::Mkdir {
                    path: "/d".into(),
                    mode: 0o755,
                },
                Some("c1".into()),
            )
            .unwrap();
        fs.create_file(Path::new("/d/f"), 0o644).unwrap();

        let replay = ReconnectReplay::new(
            journal.clone(),
            fs.clone(),
            Arc::new(RecoveryMetrics::new()),
            Arc::new(ConsistencyManager::new()),
        );
        let summary = replay.replay_for_client("c1").unwrap();
        assert_eq!(summary.replayed, 2);
        assert!(fs.is_dir(Path::new("/d")));
    }

    #[test]
    fn abandons_an_entry_after_exhausting_retries() {
        let dir = tempdir().unwrap();
        let (journal, fs) = harness(dir.path());
        // A write against a file that will never exist always fails.
        journal
            .append(
                &MutatingOp::Write {
                    path: "/missing".into(),
                    offset: 0,
                    data: vec![1],
                    stable: false,
                },
                Some("c1".into()),
            )
            .unwrap();

        let replay = ReconnectReplay::new(
            journal.clone(),
            fs,
            Arc::new(RecoveryMetrics::new()),
            Arc::new(ConsistencyManager::new()),
        );
        let summary = replay.replay_for_client("c1").unwrap();
        assert_eq!(summary.abandoned, 1);
        assert!(journal.get_incomplete().unwrap().is_empty());
    }
}
