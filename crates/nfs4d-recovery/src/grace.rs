use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::info;

use nfs4d_compound::ReclaimSink;
use nfs4d_types::{NfsStatus, Timestamp};

use crate::metrics::RecoveryMetrics;

/// Gates non-reclaim traffic for the clients [`crate::crash::CrashRecovery`]
/// found with outstanding work at crash time, until each either sends
/// `RECLAIM_COMPLETE` or the grace period's deadline passes (§4.11).
///
/// A fresh client id -- one [`crate::crash::CrashRecoveryReport`] never
/// saw -- is never gated: it has nothing to reclaim, so it is admitted
/// immediately even while the grace period is open for others.
pub struct GracePeriod {
    duration: Duration,
    active: AtomicBool,
    deadline: Mutex<Option<Timestamp>>,
    pending: Mutex<HashSet<String>>,
    metrics: Arc<RecoveryMetrics>,
}

impl GracePeriod {
    pub fn new(duration: Duration, metrics: Arc<RecoveryMetrics>) -> Self {
        Self {
            duration,
            active: AtomicBool::new(false),
            deadline: Mutex::new(None),
            pending: Mutex::new(HashSet::new()),
            metrics,
        }
    }

    /// Open the grace period with the clients that must reclaim, as
    /// reported by crash recovery. A report with no affected clients
    /// leaves the grace period closed.
    pub fn begin(&self, affected_clients: impl IntoIterator<Item = String>) {
        let pending: HashSet<String> = affected_clients.into_iter().collect();
        if pending.is_empty() {
            info!("no clients had outstanding work at crash time; grace period skipped");
            return;
        }
        info!(clients = pending.len(), "grace period opened");
        *self.pending.lock().expect("grace period poisoned") = pending;
        *self.deadline.lock().expect("grace period poisoned") = Some(Timestamp::now() + self.duration);
        self.active.store(true, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        if !self.active.load(Ordering::SeqCst) {
            return false;
        }
        let expired = self
            .deadline
            .lock()
            .expect("grace period poisoned")
            .map(|d| Timestamp::now() > d)
            .unwrap_or(true);
        if expired {
            self.end("deadline elapsed");
            return false;
        }
        true
    }

    /// Whether `client_id` may proceed with non-reclaim traffic right
    /// now.
    pub fn admit(&self, client_id: &str) -> NfsStatus {
        if !self.is_active() {
            return NfsStatus::Ok;
        }
        let pending = self.pending.lock().expect("grace period poisoned");
        if pending.contains(client_id) {
            NfsStatus::Grace
        } else {
            NfsStatus::Ok
        }
    }

    fn end(&self, reason: &str) {
        if self.active.swap(false, Ordering::SeqCst) {
            info!(reason, "grace period closed");
        }
        self.pending.lock().expect("grace period poisoned").clear();
        *self.deadline.lock().expect("grace period poisoned") = None;
    }
}

impl ReclaimSink for GracePeriod {
    /// Mark `client_id` as having reclaimed. Once every pending client
    /// has reclaimed the grace period ends immediately rather than
    /// waiting out its full deadline, matching real NFSv4 server
    /// behavior.
    fn reclaim_complete(&self, client_id: &str) {
        let emptied = {
            let mut pending = self.pending.lock().expect("grace period poisoned");
            pending.remove(client_id);
            pending.is_empty()
        };
        self.metrics.record_client_reclaimed();
        info!(client_id, "client completed reclaim");
        if emptied {
            self.end("all clients reclaimed");
        }
    }
}
