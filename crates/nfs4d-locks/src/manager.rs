use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use tracing::debug;

use nfs4d_types::{FileHandle, LockKind, Timestamp};

use crate::graph::{would_deadlock, Waiter};
use crate::region::{coalesce, split, LockRegion};
use crate::stats::LockStats;

/// Result of a [`LockManager::lock`] request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockOutcome {
    Granted,
    Conflict,
    Deadlock,
    Upgraded,
    Downgraded,
}

/// Result of a [`LockManager::unlock`] request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnlockOutcome {
    Released,
}

#[derive(Default)]
struct FileLock {
    regions: Mutex<Vec<LockRegion>>,
    cond: Condvar,
}

/// The per-file byte-range advisory lock manager (§4.5).
///
/// Lock ordering invariant: this manager's per-file locks never nest
/// with the handle-table mutex or the WAL mutex (handle-table mutex <
/// per-file lock < WAL mutex) -- callers take the handle-table lock (if
/// any) strictly before calling into this manager, never while holding a
/// `FileLock`.
pub struct LockManager {
    files: Mutex<HashMap<FileHandle, Arc<FileLock>>>,
    waiters: Mutex<Vec<Waiter>>,
    pub stats: LockStats,
    wait_timeout: Duration,
}

impl LockManager {
    pub fn new(wait_timeout: Duration) -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            waiters: Mutex::new(Vec::new()),
            stats: LockStats::default(),
            wait_timeout,
        }
    }

    fn file_for(&self, handle: FileHandle) -> Arc<FileLock> {
        let mut files = self.files.lock().expect("lock table poisoned");
        files.entry(handle).or_insert_with(Default::default).clone()
    }

    /// Grant, queue, or refuse a byte-range lock request, per the
    /// granting algorithm in §4.5.
    pub fn lock(
        &self,
        handle: FileHandle,
        offset: u64,
        length: u64,
        kind: LockKind,
        holder: &str,
        wait: bool,
    ) -> LockOutcome {
        self.stats.record_attempt();
        let file = self.file_for(handle);
        let deadline = Instant::now() + self.wait_timeout;

        loop {
            let mut regions = file.regions.lock().expect("file lock poisoned");

            // Step 1: exact-range, same-holder, different-kind request is
            // an upgrade or downgrade.
            if let Some(idx) = regions
                .iter()
                .position(|r| r.holder == holder && r.offset == offset && r.length == length && r.kind != kind)
            {
                if kind == LockKind::Write {
                    let blocked = regions
                        .iter()
                        .any(|r| r.holder != holder && r.overlaps_range(offset, length));
                    if !blocked {
                        regions[idx].kind = LockKind::Write;
                        regions[idx].granted_at = Timestamp::now();
                        coalesce(&mut regions);
                        file.cond.notify_all();
                        self.stats.record_success();
                        self.stats.record_upgrade();
                        return LockOutcome::Upgraded;
                    }
                    // Another holder overlaps: fall through to the
                    // ordinary conflict path below.
                } else {
                    regions[idx].kind = LockKind::Read;
                    regions[idx].granted_at = Timestamp::now();
                    coalesce(&mut regions);
                    file.cond.notify_all();
                    self.stats.record_success();
                    self.stats.record_downgrade();
                    return LockOutcome::Downgraded;
                }
            }

            // Step 2: overlap/conflict check.
            let conflicting_holders: Vec<String> = regions
                .iter()
                .filter(|r| {
                    r.holder != holder && r.overlaps_range(offset, length) && r.kind.conflicts_with(kind)
                })
                .map(|r| r.holder.clone())
                .collect();

            if conflicting_holders.is_empty() {
                regions.push(LockRegion {
                    offset,
                    length,
                    kind,
                    holder: holder.to_string(),
                    granted_at: Timestamp::now(),
                });
                coalesce(&mut regions);
                self.stats.record_success();
                return LockOutcome::Granted;
            }

            if !wait {
                self.stats.record_failure();
                return LockOutcome::Conflict;
            }

            let waiters_snapshot = self.waiters.lock().expect("waiters poisoned").clone();
            if would_deadlock(holder, &conflicting_holders, &waiters_snapshot) {
                self.stats.record_deadlock();
                return LockOutcome::Deadlock;
            }

            self.waiters.lock().expect("waiters poisoned").push(Waiter {
                holder: holder.to_string(),
                blocked_on: conflicting_holders,
            });

            let wait_start = Instant::now();
            let remaining = deadline.saturating_duration_since(Instant::now());
            let (_guard, timeout_result) = file
                .cond
                .wait_timeout(regions, remaining)
                .expect("file lock poisoned");

            self.waiters
                .lock()
                .expect("waiters poisoned")
                .retain(|w| w.holder != holder);
            self.stats.record_wait(wait_start.elapsed());

            if timeout_result.timed_out() || Instant::now() >= deadline {
                self.stats.record_timeout();
                return LockOutcome::Conflict;
            }
            // Re-evaluate from the top with a fresh regions snapshot.
        }
    }

    /// Release `[offset, offset+length)` held by `holder`, splitting any
    /// partially-covered regions.
    pub fn unlock(&self, handle: FileHandle, offset: u64, length: u64, holder: &str) -> UnlockOutcome {
        let file = self.file_for(handle);
        let mut regions = file.regions.lock().expect("file lock poisoned");
        let mut next = Vec::with_capacity(regions.len());
        for region in regions.drain(..) {
            if region.holder == holder && region.overlaps_range(offset, length) {
                next.extend(split(&region, offset, length));
            } else {
                next.push(region);
            }
        }
        *regions = next;
        file.cond.notify_all();
        UnlockOutcome::Released
    }

    /// Drop every region held by `holder` across every file and wake
    /// anyone blocked on them. Called on connection close.
    pub fn release_holder(&self, holder: &str) {
        let files: Vec<Arc<FileLock>> = self.files.lock().expect("lock table poisoned").values().cloned().collect();
        for file in files {
            let mut regions = file.regions.lock().expect("file lock poisoned");
            let before = regions.len();
            regions.retain(|r| r.holder != holder);
            if regions.len() != before {
                file.cond.notify_all();
            }
        }
        self.waiters
            .lock()
            .expect("waiters poisoned")
            .retain(|w| w.holder != holder);
    }

    /// Delete regions older than `max_age` and wake their waiters. The
    /// only safety net for a holder that disappeared without a clean
    /// `release_holder` call.
    pub fn reap_stale(&self, max_age: Duration) {
        let files: Vec<Arc<FileLock>> = self.files.lock().expect("lock table poisoned").values().cloned().collect();
        for file in files {
            let mut regions = file.regions.lock().expect("file lock poisoned");
            let before = regions.len();
            regions.retain(|r| !r.granted_at.has_elapsed(max_age));
            if regions.len() != before {
                debug!(reaped = before - regions.len(), "stale-lock reaper removed regions");
                file.cond.notify_all();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(byte: u8) -> FileHandle {
        FileHandle::from_bytes([byte; 16])
    }

    #[test]
    fn second_writer_conflicts_without_wait() {
        let mgr = LockManager::new(Duration::from_secs(30));
        let h = handle(1);
        assert_eq!(
            mgr.lock(h, 0, 1024, LockKind::Write, "c1", false),
            LockOutcome::Granted
        );
        assert_eq!(
            mgr.lock(h, 512, 1024, LockKind::Write, "c2", false),
            LockOutcome::Conflict
        );
    }

    #[test]
    fn read_locks_from_different_holders_coexist() {
        let mgr = LockManager::new(Duration::from_secs(30));
        let h = handle(2);
        assert_eq!(
            mgr.lock(h, 0, 4096, LockKind::Read, "c1", false),
            LockOutcome::Granted
        );
        assert_eq!(
            mgr.lock(h, 0, 4096, LockKind::Read, "c2", false),
            LockOutcome::Granted
        );
    }

    #[test]
    fn upgrade_blocked_by_other_readers_reports_locked() {
        let mgr = LockManager::new(Duration::from_secs(30));
        let h = handle(3);
        mgr.lock(h, 0, 4096, LockKind::Read, "c1", false);
        mgr.lock(h, 0, 4096, LockKind::Read, "c2", false);
        assert_eq!(
            mgr.lock(h, 0, 4096, LockKind::Write, "c1", false),
            LockOutcome::Conflict
        );
        mgr.unlock(h, 0, 4096, "c2");
        assert_eq!(
            mgr.lock(h, 0, 4096, LockKind::Write, "c1", false),
            LockOutcome::Upgraded
        );
    }

    #[test]
    fn downgrade_always_succeeds() {
        let mgr = LockManager::new(Duration::from_secs(30));
        let h = handle(4);
        mgr.lock(h, 0, 100, LockKind::Write, "c1", false);
        assert_eq!(
            mgr.lock(h, 0, 100, LockKind::Read, "c1", false),
            LockOutcome::Downgraded
        );
    }

    #[test]
    fn release_holder_frees_all_its_regions() {
        let mgr = LockManager::new(Duration::from_secs(30));
        let h = handle(5);
        mgr.lock(h, 0, 100, LockKind::Write, "c1", false);
        mgr.release_holder("c1");
        assert_eq!(
            mgr.lock(h, 0, 100, LockKind::Write, "c2", false),
            LockOutcome::Granted
        );
    }

    #[test]
    fn partial_unlock_splits_region() {
        let mgr = LockManager::new(Duration::from_secs(30));
        let h = handle(6);
        mgr.lock(h, 0, 100, LockKind::Write, "c1", false);
        mgr.unlock(h, 40, 10, "c1");
        // The gap is free; c2 can take it.
        assert_eq!(
            mgr.lock(h, 40, 10, LockKind::Write, "c2", false),
            LockOutcome::Granted
        );
        // But the residual ranges are still held by c1.
        assert_eq!(
            mgr.lock(h, 0, 40, LockKind::Write, "c2", false),
            LockOutcome::Conflict
        );
    }

    #[test]
    fn attempts_equal_successes_plus_failures_plus_deadlocks_plus_timeouts() {
        let mgr = LockManager::new(Duration::from_secs(30));
        let h = handle(7);
        mgr.lock(h, 0, 10, LockKind::Write, "c1", false);
        mgr.lock(h, 0, 10, LockKind::Write, "c2", false);
        mgr.lock(h, 20, 10, LockKind::Write, "c3", false);
        let snap = mgr.stats.snapshot();
        assert_eq!(
            snap.attempts,
            snap.successes + snap.failures + snap.deadlocks + snap.timeouts
        );
    }

    #[test]
    fn stale_reaper_drops_old_regions() {
        let mgr = LockManager::new(Duration::from_secs(30));
        let h = handle(8);
        mgr.lock(h, 0, 10, LockKind::Write, "c1", false);
        mgr.reap_stale(Duration::from_secs(0));
        assert_eq!(
            mgr.lock(h, 0, 10, LockKind::Write, "c2", false),
            LockOutcome::Granted
        );
    }
}
