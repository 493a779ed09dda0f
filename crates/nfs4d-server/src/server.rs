//! Top-level process wiring (§4.12): open the WAL and journal, run
//! crash recovery before admitting traffic, open the grace period for
//! whatever clients crash recovery found outstanding work for, start
//! the background threads, and run the accept loop.

use std::net::TcpListener;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use nfs4d_auth::AuthGate;
use nfs4d_compound::{CompoundEngine, ReclaimSink};
use nfs4d_fs::{FilesystemOracle, LocalFilesystem};
use nfs4d_handles::{HandleTable, InMemoryHandleTable};
use nfs4d_journal::{Journal, OperationJournal};
use nfs4d_locks::LockManager;
use nfs4d_recovery::{ConsistencyManager, CrashRecovery, GracePeriod, ReconnectReplay, RecoveryMetrics};
use nfs4d_session::SessionManager;
use nfs4d_state::StateManager;
use nfs4d_wal::TransactionLog;

use crate::background::{BackgroundThreads, ReplayWorkerPool};
use crate::config::Config;
use crate::connection::{self, ConnectionContext};
use crate::error::ServerResult;

/// A fully wired, crash-recovered server, not yet accepting connections.
/// Everything between [`Server::start`] returning and the first byte of
/// client traffic reaching the compound engine has already happened:
/// the WAL and journal are open, crash recovery has run, and the grace
/// period (if any) is open.
pub struct Server {
    config: Config,
    ctx: Arc<ConnectionContext<LocalFilesystem>>,
    background: BackgroundThreads,
    replay_pool: ReplayWorkerPool,
}

impl Server {
    /// Open storage, run crash recovery, and start every background
    /// thread named in §5. Does not yet accept connections; call
    /// [`Server::serve`] for that.
    pub fn start(config: Config) -> ServerResult<Self> {
        let fs = Arc::new(LocalFilesystem::new());
        let fs_oracle: Arc<dyn FilesystemOracle> = fs.clone();
        let handles: Arc<dyn HandleTable> = Arc::new(InMemoryHandleTable::new(&config.root_path));
        let wal = Arc::new(TransactionLog::open(&config.wal_path)?);
        let journal: Arc<dyn OperationJournal> = Arc::new(Journal::open(&config.journal_path, wal.clone())?);
        let locks = Arc::new(LockManager::new(config.lock_wait_timeout()));
        let state = Arc::new(StateManager::new(config.lease_duration()));
        let sessions = Arc::new(SessionManager::new(config.session_timeout()));
        let auth = Arc::new(AuthGate::new());
        let metrics = Arc::new(RecoveryMetrics::new());
        let consistency = Arc::new(ConsistencyManager::new());

        info!(
            wal_path = %config.wal_path.display(),
            journal_path = %config.journal_path.display(),
            "running crash recovery"
        );
        let crash = CrashRecovery::new(wal.clone(), journal.clone(), fs_oracle.clone(), metrics.clone(), consistency.clone());
        let report = crash.run()?;
        info!(
            redone = report.redone,
            undone = report.undone,
            affected_clients = report.affected_clients.len(),
            "crash recovery complete"
        );

        let grace = Arc::new(GracePeriod::new(config.grace_period(), metrics.clone()));
        grace.begin(report.affected_clients);

        let engine = Arc::new(CompoundEngine::new(
            fs,
            handles,
            locks.clone(),
            state.clone(),
            sessions.clone(),
            journal.clone(),
            auth.clone(),
            Some(grace.clone() as Arc<dyn ReclaimSink>),
        ));

        let (replay_tx, replay_rx) = crossbeam_channel::unbounded();
        let replay = Arc::new(ReconnectReplay::new(journal, fs_oracle, metrics, consistency));
        let replay_pool = ReplayWorkerPool::spawn(replay, replay_rx, available_parallelism());

        let ctx = Arc::new(ConnectionContext {
            engine,
            auth,
            sessions: sessions.clone(),
            locks: locks.clone(),
            grace,
            replay_queue: Some(replay_tx),
        });

        let background = BackgroundThreads::spawn(locks, state, sessions, wal, config.stale_lock_sweep_interval());

        Ok(Self {
            config,
            ctx,
            background,
            replay_pool,
        })
    }

    /// Run the accept loop until `stop` is set, spawning one
    /// `std::thread` per connection (§4.12, §5's "never async" rule).
    /// On return, every in-flight connection has been joined and every
    /// background thread has been signalled to stop and joined: the
    /// caller's only remaining responsibility is the process exit code.
    pub fn serve(self, stop: Arc<AtomicBool>) -> ServerResult<()> {
        let listener = TcpListener::bind(("0.0.0.0", self.config.port))?;
        listener.set_nonblocking(true)?;
        info!(port = self.config.port, "nfs4d listening");

        let mut connections = Vec::new();
        while !stop.load(Ordering::SeqCst) {
            match listener.accept() {
                Ok((stream, peer)) => {
                    let ctx = self.ctx.clone();
                    connections.retain(|h: &std::thread::JoinHandle<()>| !h.is_finished());
                    connections.push(std::thread::spawn(move || {
                        tracing::debug!(%peer, "connection accepted");
                        connection::serve_connection(stream, ctx);
                    }));
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(Duration::from_millis(50));
                }
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    std::thread::sleep(Duration::from_millis(50));
                }
            }
        }

        info!("shutdown requested: draining connections");
        for handle in connections {
            let _ = handle.join();
        }
        self.background.shutdown();
        self.replay_pool.shutdown();
        Ok(())
    }
}

fn available_parallelism() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_opens_storage_and_runs_crash_recovery() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            port: 0,
            root_path: dir.path().to_path_buf(),
            wal_path: dir.path().join("wal"),
            journal_path: dir.path().join("journal"),
            ..Config::default()
        };
        let server = Server::start(config).unwrap();
        server.background.shutdown();
        server.replay_pool.shutdown();
    }

    #[test]
    fn serve_stops_promptly_once_the_stop_flag_is_set() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            port: 0,
            root_path: dir.path().to_path_buf(),
            wal_path: dir.path().join("wal"),
            journal_path: dir.path().join("journal"),
            ..Config::default()
        };
        let server = Server::start(config).unwrap();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = stop.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            stop_clone.store(true, Ordering::SeqCst);
        });
        server.serve(stop).unwrap();
    }
}
