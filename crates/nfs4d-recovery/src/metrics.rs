use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide recovery counters, owned by [`crate::RecoveryEngine`] and
/// handed out by reference rather than kept as static globals.
///
/// Every field is a monotonically increasing counter; callers that want
/// a point-in-time view should take a [`RecoveryMetricsSnapshot`].
#[derive(Default)]
pub struct RecoveryMetrics {
    crash_recoveries_run: AtomicU64,
    ops_redone: AtomicU64,
    ops_undone: AtomicU64,
    ops_failed: AtomicU64,
    reconnect_replays_run: AtomicU64,
    reconnect_ops_replayed: AtomicU64,
    reconnect_ops_retried: AtomicU64,
    reconnect_ops_abandoned: AtomicU64,
    clients_reclaimed: AtomicU64,
}

/// A point-in-time copy of [`RecoveryMetrics`]'s counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RecoveryMetricsSnapshot {
    pub crash_recoveries_run: u64,
    pub ops_redone: u64,
    pub ops_undone: u64,
    pub ops_failed: u64,
    pub reconnect_replays_run: u64,
    pub reconnect_ops_replayed: u64,
    pub reconnect_ops_retried: u64,
    pub reconnect_ops_abandoned: u64,
    pub clients_reclaimed: u64,
}

impl RecoveryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_crash_recovery_run(&self) {
        self.crash_recoveries_run.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_redo(&self) {
        self.ops_redone.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_undo(&self) {
        self.ops_undone.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.ops_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reconnect_replay_run(&self) {
        self.reconnect_replays_run.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reconnect_op(&self) {
        self.reconnect_ops_replayed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reconnect_retry(&self) {
        self.reconnect_ops_retried.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reconnect_abandoned(&self) {
        self.reconnect_ops_abandoned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_client_reclaimed(&self) {
        self.clients_reclaimed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RecoveryMetricsSnapshot {
        RecoveryMetricsSnapshot {
            crash_recoveries_run: self.crash_recoveries_run.load(Ordering::Relaxed),
            ops_redone: self.ops_redone.load(Ordering::Relaxed),
            ops_undone: self.ops_undone.load(Ordering::Relaxed),
            ops_failed: self.ops_failed.load(Ordering::Relaxed),
            reconnect_replays_run: self.reconnect_replays_run.load(Ordering::Relaxed),
            reconnect_ops_replayed: self.reconnect_ops_replayed.load(Ordering::Relaxed),
            reconnect_ops_retried: self.reconnect_ops_retried.load(Ordering::Relaxed),
            reconnect_ops_abandoned: self.reconnect_ops_abandoned.load(Ordering::Relaxed),
            clients_reclaimed: self.clients_reclaimed.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let m = RecoveryMetrics::new();
        assert_eq!(m.snapshot(), RecoveryMetricsSnapshot::default());
    }

    #[test]
    fn records_accumulate() {
        let m = RecoveryMetrics::new();
        m.record_redo();
        m.record_redo();
        m.record_undo();
        let snap = m.snapshot();
        assert_eq!(snap.ops_redone, 2);
        assert_eq!(snap.ops_undone, 1);
    }
}
