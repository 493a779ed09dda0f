use crate::entry::{JournalEntry, JournalOutcome};
use crate::error::JournalResult;
use crate::op::MutatingOp;

/// Ordered, dependency-tracked log of high-level mutating operations,
/// layered on the WAL for durability (see §4.4).
pub trait OperationJournal: Send + Sync {
    /// Allocate a fresh `seq_id`, open the paired WAL transaction, and
    /// append an incomplete entry. `client_id` tags the entry for
    /// per-client reconnect replay.
    fn append(&self, op: &MutatingOp, client_id: Option<String>) -> JournalResult<u64>;

    /// Record that `seq` must not be replayed before `depends_on_seq`
    /// completes.
    fn add_dependency(&self, seq: u64, depends_on_seq: u64) -> JournalResult<()>;

    /// `true` iff every dependency of `seq` has completed successfully
    /// (or is no longer tracked, i.e. already compacted away).
    fn check_dependencies(&self, seq: u64) -> JournalResult<bool>;

    /// Save the bytes needed to undo `seq`'s effect.
    fn begin_state_transition(&self, seq: u64, pre_state: Vec<u8>) -> JournalResult<()>;

    /// Commit the WAL transaction paired with `seq`.
    fn commit_state_transition(&self, seq: u64) -> JournalResult<()>;

    /// Roll back the WAL transaction paired with `seq`.
    fn rollback_state_transition(&self, seq: u64) -> JournalResult<()>;

    /// Write a completion record and ensure the paired WAL transaction is
    /// resolved (committed on success, rolled back on failure) if it was
    /// not already resolved by an explicit `commit_state_transition` /
    /// `rollback_state_transition` call.
    fn complete(&self, seq: u64, result: JournalOutcome) -> JournalResult<()>;

    /// Every incomplete entry, ordered per §4.4's replay-ordering rules
    /// (temporal per path unless an explicit dependency overrides;
    /// disjoint paths may interleave; a dependency cycle is fatal).
    fn recover(&self) -> JournalResult<Vec<JournalEntry>>;

    /// Every incomplete entry, unordered, for the recovery engine's
    /// WAL/journal cross-reference.
    fn get_incomplete(&self) -> JournalResult<Vec<JournalEntry>>;

    /// Rewrite the on-disk journal to contain only entries whose
    /// `seq_id` is in `keep`, truncating the rest. Mirrors
    /// `TransactionLog::compact`.
    fn compact(&self, keep: &[u64]) -> JournalResult<()>;
}
