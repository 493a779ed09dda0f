use nfs4d_auth::Credentials;
use nfs4d_types::{FileHandle, NfsStatus};

/// The per-request mutable state a compound walks through: the current
/// and saved filehandle, the caller's authenticated identity, and the
/// status the engine stops on.
pub struct CompoundContext {
    pub current_fh: Option<FileHandle>,
    pub saved_fh: Option<FileHandle>,
    pub credentials: Credentials,
    pub status: NfsStatus,
    /// The NFSv4 client id this request's session is bound to, set by a
    /// leading `SEQUENCE` op. Tags every mutating op's journal entry so
    /// the recovery engine can select a client's subset of the journal
    /// for reconnect replay (§4.11).
    pub client_id: Option<String>,
}

impl CompoundContext {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            current_fh: None,
            saved_fh: None,
            credentials,
            status: NfsStatus::Ok,
            client_id: None,
        }
    }

    /// A stable identity string for lock/session holder bookkeeping.
    pub fn holder_id(&self) -> String {
        self.credentials.holder_id()
    }
}

/// Releases everything a connection accumulated regardless of which
/// exit path a handler takes out -- modeled as a `Drop` guard rather
/// than a `goto cleanup` so the release step can't be skipped by an
/// early `?` return.
///
/// Construct one per accepted connection (or, for a GSS context, around
/// its lifetime) and let it fall out of scope on disconnect.
pub struct ConnectionGuard<'a> {
    holder: String,
    locks: &'a nfs4d_locks::LockManager,
    sessions: &'a nfs4d_session::SessionManager,
}

impl<'a> ConnectionGuard<'a> {
    pub fn new(
        holder: String,
        locks: &'a nfs4d_locks::LockManager,
        sessions: &'a nfs4d_session::SessionManager,
    ) -> Self {
        Self {
            holder,
            locks,
            sessions,
        }
    }
}

impl Drop for ConnectionGuard<'_> {
    fn drop(&mut self) {
        self.locks.release_holder(&self.holder);
        self.sessions.destroy_for_client(&self.holder);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nfs4d_auth::SysCredential;
    use std::time::Duration;

    #[test]
    fn guard_releases_locks_on_drop() {
        let locks = nfs4d_locks::LockManager::new(Duration::from_secs(30));
        let sessions = nfs4d_session::SessionManager::new(Duration::from_secs(1800));
        locks.lock(
            FileHandle::from_bytes([1; 16]),
            0,
            10,
            nfs4d_types::LockKind::Write,
            "sys:host:500",
            false,
        );
        {
            let _guard = ConnectionGuard::new("sys:host:500".to_string(), &locks, &sessions);
        }
        assert_eq!(
            locks.lock(
                FileHandle::from_bytes([1; 16]),
                0,
                10,
                nfs4d_types::LockKind::Write,
                "other",
                false,
            ),
            nfs4d_locks::LockOutcome::Granted
        );
    }

    #[test]
    fn new_context_starts_clean() {
        let ctx = CompoundContext::new(Credentials::Sys(SysCredential {
            stamp: 0,
            machine_name: "h".into(),
            uid: 0,
            gid: 0,
            aux_gids: vec![],
        }));
        assert!(ctx.current_fh.is_none());
        assert!(ctx.saved_fh.is_none());
        assert_eq!(ctx.status, NfsStatus::Ok);
    }
}
