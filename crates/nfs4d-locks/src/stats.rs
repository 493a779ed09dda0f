use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Lock manager statistics required by §4.5, each field an atomic
/// counter so every connection worker can update it without taking the
/// per-file lock.
#[derive(Debug, Default)]
pub struct LockStats {
    pub attempts: AtomicU64,
    pub successes: AtomicU64,
    pub failures: AtomicU64,
    pub deadlocks: AtomicU64,
    pub timeouts: AtomicU64,
    pub upgrades: AtomicU64,
    pub downgrades: AtomicU64,
    total_wait_millis: AtomicU64,
}

impl LockStats {
    pub fn record_attempt(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self) {
        self.successes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_deadlock(&self) {
        self.deadlocks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_upgrade(&self) {
        self.upgrades.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_downgrade(&self) {
        self.downgrades.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_wait(&self, d: Duration) {
        self.total_wait_millis
            .fetch_add(d.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn total_wait(&self) -> Duration {
        Duration::from_millis(self.total_wait_millis.load(Ordering::Relaxed))
    }

    /// `attempts == successes + failures + deadlocks + timeouts`, per the
    /// testable property in §8. The four outcomes are disjoint: a timed-out
    /// wait (which also resolves to `Conflict`) is counted only as a
    /// timeout, not also a failure.
    pub fn snapshot(&self) -> LockStatsSnapshot {
        LockStatsSnapshot {
            attempts: self.attempts.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            deadlocks: self.deadlocks.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            upgrades: self.upgrades.load(Ordering::Relaxed),
            downgrades: self.downgrades.load(Ordering::Relaxed),
            total_wait: self.total_wait(),
        }
    }
}

/// A point-in-time, non-atomic copy of [`LockStats`] for reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LockStatsSnapshot {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub deadlocks: u64,
    pub timeouts: u64,
    pub upgrades: u64,
    pub downgrades: u64,
    pub total_wait: Duration,
}
