use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use nfs4d_types::Timestamp;
use tracing::info;

use crate::error::{StateError, StateResult};
use crate::model::{ClientIdentity, Lease, StateKind, StateRecord, StateType};

struct ClientRecord {
    identity: ClientIdentity,
    confirmed: bool,
    lease: Lease,
    states: Vec<StateRecord>,
    next_seqid: u32,
}

/// Owns the client registry and every state object bound to it (§4.6).
pub struct StateManager {
    clients: Mutex<HashMap<String, ClientRecord>>,
    lease_duration: Duration,
}

impl StateManager {
    pub fn new(lease_duration: Duration) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            lease_duration,
        }
    }

    /// Register a client id, or confirm an existing registration is
    /// still the same client by verifier.
    pub fn register(&self, client_id: &str, verifier: &[u8]) -> StateResult<()> {
        let mut clients = self.clients.lock().expect("state registry poisoned");
        match clients.get(client_id) {
            Some(existing) if existing.identity.verifier == verifier => Ok(()),
            Some(_) => Err(StateError::ClientIdInUse),
            None => {
                let now = Timestamp::now();
                clients.insert(
                    client_id.to_string(),
                    ClientRecord {
                        identity: ClientIdentity {
                            client_id: client_id.to_string(),
                            verifier: verifier.to_vec(),
                        },
                        confirmed: false,
                        lease: Lease {
                            grant_time: now,
                            expiry: now + self.lease_duration,
                        },
                        states: Vec::new(),
                        next_seqid: 1,
                    },
                );
                Ok(())
            }
        }
    }

    pub fn confirm(&self, client_id: &str) -> StateResult<()> {
        let mut clients = self.clients.lock().expect("state registry poisoned");
        let record = clients.get_mut(client_id).ok_or(StateError::UnknownClient)?;
        record.confirmed = true;
        self.refresh(record);
        Ok(())
    }

    pub fn renew(&self, client_id: &str) -> StateResult<()> {
        let mut clients = self.clients.lock().expect("state registry poisoned");
        let record = clients.get_mut(client_id).ok_or(StateError::UnknownClient)?;
        if !record.confirmed {
            return Err(StateError::NotConfirmed);
        }
        self.refresh(record);
        Ok(())
    }

    fn refresh(&self, record: &mut ClientRecord) {
        let now = Timestamp::now();
        record.lease = Lease {
            grant_time: now,
            expiry: now + self.lease_duration,
        };
    }

    /// Attach a new state object to a confirmed, unexpired client.
    /// Returns the fresh `seqid` assigned to it.
    pub fn add_state(&self, client_id: &str, kind: StateKind) -> StateResult<u32> {
        let mut clients = self.clients.lock().expect("state registry poisoned");
        let record = clients.get_mut(client_id).ok_or(StateError::UnknownClient)?;
        if !record.confirmed {
            return Err(StateError::NotConfirmed);
        }
        if record.lease.is_expired(Timestamp::now()) {
            return Err(StateError::LeaseExpired);
        }
        let seqid = record.next_seqid;
        record.next_seqid += 1;
        let expiry = record.lease.expiry;
        record.states.push(StateRecord {
            client_id: client_id.to_string(),
            seqid,
            expiry,
            kind,
        });
        Ok(seqid)
    }

    pub fn remove_state(&self, client_id: &str, state_type: StateType, seqid: u32) -> StateResult<()> {
        let mut clients = self.clients.lock().expect("state registry poisoned");
        let record = clients.get_mut(client_id).ok_or(StateError::UnknownClient)?;
        let before = record.states.len();
        record
            .states
            .retain(|s| !(s.seqid == seqid && s.kind.state_type() == state_type));
        if record.states.len() == before {
            return Err(StateError::UnknownState);
        }
        Ok(())
    }

    pub fn find_state(&self, client_id: &str, state_type: StateType, seqid: u32) -> StateResult<StateRecord> {
        let clients = self.clients.lock().expect("state registry poisoned");
        let record = clients.get(client_id).ok_or(StateError::UnknownClient)?;
        record
            .states
            .iter()
            .find(|s| s.seqid == seqid && s.kind.state_type() == state_type)
            .cloned()
            .ok_or(StateError::UnknownState)
    }

    /// Drop every client whose lease has expired, along with all of its
    /// state objects. Returns the number of clients dropped.
    pub fn cleanup_expired(&self) -> usize {
        let now = Timestamp::now();
        let mut clients = self.clients.lock().expect("state registry poisoned");
        let before = clients.len();
        clients.retain(|_, record| !record.lease.is_expired(now));
        let dropped = before - clients.len();
        if dropped > 0 {
            info!(dropped, "cleanup_expired dropped clients with expired leases");
        }
        dropped
    }

    /// Whether `client_id` is registered and confirmed, regardless of
    /// lease state -- used by the recovery engine to distinguish a fresh
    /// registration from a reclaim.
    pub fn is_known(&self, client_id: &str) -> bool {
        self.clients
            .lock()
            .expect("state registry poisoned")
            .contains_key(client_id)
    }
}
