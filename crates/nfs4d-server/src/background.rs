//! Background threads the process wiring owns alongside the accept
//! loop (§4.12, §5): the stale-lock reaper, the expiry sweeper, the
//! WAL/journal durability sync, and the reconnect-replay worker pool.
//! Every one of these is a plain `std::thread` loop, never a tokio
//! task, per §5's "never async" rule.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, info, warn};

use nfs4d_locks::LockManager;
use nfs4d_recovery::ReconnectReplay;
use nfs4d_session::SessionManager;
use nfs4d_state::StateManager;
use nfs4d_wal::TransactionLog;

/// Longest a lock may sit unreleased with no activity from its holder
/// before the reaper considers it stale. Not part of the configuration
/// surface; locks are reaped far more conservatively than leases expire.
const STALE_LOCK_MAX_AGE: Duration = Duration::from_secs(300);

/// How often the WAL is fsynced in the background, independent of the
/// per-transaction sync each commit already performs.
const WAL_SYNC_INTERVAL: Duration = Duration::from_secs(5);

/// Handles for every background thread, so shutdown can signal and join
/// them instead of leaking them past the accept loop's own exit.
pub struct BackgroundThreads {
    stop: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl BackgroundThreads {
    /// Spawn the stale-lock reaper, the lease/session expiry sweeper,
    /// and a periodic WAL sync, all gated by `stale_lock_sweep_interval`
    /// and the lease/session timeouts in `Config`.
    pub fn spawn(
        locks: Arc<LockManager>,
        state: Arc<StateManager>,
        sessions: Arc<SessionManager>,
        wal: Arc<TransactionLog>,
        stale_lock_sweep_interval: Duration,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let mut handles = Vec::new();

        handles.push(spawn_loop(stop.clone(), stale_lock_sweep_interval, move || {
            locks.reap_stale(STALE_LOCK_MAX_AGE);
        }));

        handles.push(spawn_loop(stop.clone(), Duration::from_secs(30), move || {
            let expired_clients = state.cleanup_expired();
            let expired_sessions = sessions.cleanup_expired();
            if expired_clients > 0 || expired_sessions > 0 {
                debug!(expired_clients, expired_sessions, "expiry sweep reclaimed state");
            }
        }));

        handles.push(spawn_loop(stop.clone(), WAL_SYNC_INTERVAL, move || {
            if let Err(e) = wal.sync() {
                warn!(error = %e, "background WAL sync failed");
            }
        }));

        Self { stop, handles }
    }

    /// Signal every background thread to stop after its current
    /// iteration and join them all.
    pub fn shutdown(self) {
        self.stop.store(true, Ordering::SeqCst);
        for handle in self.handles {
            let _ = handle.join();
        }
    }
}

fn spawn_loop<Body>(stop: Arc<AtomicBool>, interval: Duration, mut body: Body) -> JoinHandle<()>
where
    Body: FnMut() + Send + 'static,
{
    std::thread::spawn(move || {
        while !stop.load(Ordering::SeqCst) {
            body();
            std::thread::sleep(interval);
        }
    })
}

/// Consumes client ids from a reconnecting-session queue and replays
/// each one's pending journal entries (§4.11). Sized to the machine's
/// CPU count, the way a worker pool consuming a bounded amount of work
/// per client naturally would be: replay is per-client-serial (the
/// journal's dependency rules already order one client's own entries)
/// but independent clients reconnecting at once shouldn't queue behind
/// each other.
pub struct ReplayWorkerPool {
    stop: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl ReplayWorkerPool {
    pub fn spawn(
        replay: Arc<ReconnectReplay>,
        receiver: crossbeam_channel::Receiver<String>,
        worker_count: usize,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let mut handles = Vec::with_capacity(worker_count);
        for _ in 0..worker_count.max(1) {
            let replay = replay.clone();
            let receiver = receiver.clone();
            let stop = stop.clone();
            handles.push(std::thread::spawn(move || {
                while !stop.load(Ordering::SeqCst) {
                    match receiver.recv_timeout(Duration::from_millis(250)) {
                        Ok(client_id) => match replay.replay_for_client(&client_id) {
                            Ok(summary) => info!(
                                client_id,
                                replayed = summary.replayed,
                                abandoned = summary.abandoned,
                                "reconnect replay finished"
                            ),
                            Err(e) => warn!(client_id, error = %e, "reconnect replay failed"),
                        },
                        Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
                        Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
                    }
                }
            }));
        }
        Self { stop, handles }
    }

    pub fn shutdown(self) {
        self.stop.store(true, Ordering::SeqCst);
        for handle in self.handles {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    #[test]
    fn background_loop_runs_at_least_once_before_shutdown() {
        let stop = Arc::new(AtomicBool::new(false));
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let handle = spawn_loop(stop.clone(), Duration::from_millis(5), move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        let start = Instant::now();
        while count.load(Ordering::SeqCst) == 0 && start.elapsed() < Duration::from_secs(1) {
            std::thread::sleep(Duration::from_millis(5));
        }
        stop.store(true, Ordering::SeqCst);
        handle.join().unwrap();
        assert!(count.load(Ordering::SeqCst) >= 1);
    }
}
