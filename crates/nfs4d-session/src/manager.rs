use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use nfs4d_types::Timestamp;

use crate::error::{SessionError, SessionResult};
use crate::model::Session;

/// Owns every live session and enforces per-session sequence-id
/// monotonicity (§4.7).
pub struct SessionManager {
    sessions: Mutex<HashMap<u32, Session>>,
    next_id: AtomicU32,
    idle_timeout: Duration,
}

impl SessionManager {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            next_id: AtomicU32::new(1),
            idle_timeout,
        }
    }

    pub fn create(&self, client_id: &str) -> u32 {
        let session_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let session = Session {
            session_id,
            client_id: client_id.to_string(),
            expiry: Timestamp::now() + self.idle_timeout,
            confirmed: false,
            last_seq: None,
        };
        self.sessions
            .lock()
            .expect("session table poisoned")
            .insert(session_id, session);
        session_id
    }

    pub fn confirm(&self, session_id: u32) -> SessionResult<()> {
        let mut sessions = self.sessions.lock().expect("session table poisoned");
        let session = sessions.get_mut(&session_id).ok_or(SessionError::UnknownSession)?;
        session.confirmed = true;
        session.expiry = Timestamp::now() + self.idle_timeout;
        Ok(())
    }

    pub fn destroy(&self, session_id: u32) -> SessionResult<()> {
        self.sessions
            .lock()
            .expect("session table poisoned")
            .remove(&session_id)
            .map(|_| ())
            .ok_or(SessionError::UnknownSession)
    }

    pub fn renew(&self, session_id: u32) -> SessionResult<()> {
        let mut sessions = self.sessions.lock().expect("session table poisoned");
        let session = sessions.get_mut(&session_id).ok_or(SessionError::UnknownSession)?;
        if !session.confirmed {
            return Err(SessionError::NotConfirmed);
        }
        session.expiry = Timestamp::now() + self.idle_timeout;
        Ok(())
    }

    /// `true` iff the session is confirmed and `seq_id` is strictly
    /// greater than its last accepted sequence id (or none has been
    /// accepted yet).
    pub fn check_sequence(&self, session_id: u32, seq_id: u32) -> SessionResult<bool> {
        let sessions = self.sessions.lock().expect("session table poisoned");
        let session = sessions.get(&session_id).ok_or(SessionError::UnknownSession)?;
        if !session.confirmed {
            return Ok(false);
        }
        Ok(session.last_seq.map_or(true, |last| seq_id > last))
    }

    /// Record a new high-water mark and refresh the session's expiry.
    /// Callers must have already checked [`Self::check_sequence`].
    pub fn update_sequence(&self, session_id: u32, seq_id: u32) -> SessionResult<()> {
        let mut sessions = self.sessions.lock().expect("session table poisoned");
        let session = sessions.get_mut(&session_id).ok_or(SessionError::UnknownSession)?;
        if let Some(last) = session.last_seq {
            if seq_id <= last {
                return Err(SessionError::SeqMisordered { last, got: seq_id });
            }
        }
        session.last_seq = Some(seq_id);
        session.expiry = Timestamp::now() + self.idle_timeout;
        Ok(())
    }

    /// The client id a session is bound to, used by the compound engine
    /// to tag journal entries so the recovery engine can select a
    /// client's subset of the journal for reconnect replay.
    pub fn client_id_for(&self, session_id: u32) -> SessionResult<String> {
        let sessions = self.sessions.lock().expect("session table poisoned");
        sessions
            .get(&session_id)
            .map(|s| s.client_id.clone())
            .ok_or(SessionError::UnknownSession)
    }

    /// Drop every session that has gone idle past its expiry. Returns
    /// the number of sessions dropped.
    pub fn cleanup_expired(&self) -> usize {
        let now = Timestamp::now();
        let mut sessions = self.sessions.lock().expect("session table poisoned");
        let before = sessions.len();
        sessions.retain(|_, s| s.expiry > now);
        before - sessions.len()
    }

    /// Drop every session bound to `client_id`, e.g. on lease expiry or
    /// explicit client removal.
    pub fn destroy_for_client(&self, client_id: &str) {
        self.sessions
            .lock()
            .expect("session table poisoned")
            .retain(|_, s| s.client_id != client_id);
    }
}
