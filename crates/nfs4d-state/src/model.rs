use nfs4d_types::{FileHandle, LockKind, Timestamp};

/// A registered client, as presented on the wire: an opaque id plus a
/// verifier the client re-sends to prove continuity across reconnects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientIdentity {
    pub client_id: String,
    pub verifier: Vec<u8>,
}

/// The renewable lease backing a client's confirmed registration.
/// Expiry invalidates every [`StateRecord`] owned by that client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Lease {
    pub grant_time: Timestamp,
    pub expiry: Timestamp,
}

impl Lease {
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now > self.expiry
    }
}

/// Which kind of [`StateKind`] a lookup is asking for, without needing the
/// full payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StateType {
    Open,
    Lock,
    Delegation,
}

/// The tagged state-object variant (§3's `State`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StateKind {
    Open {
        handle: FileHandle,
        share_access: u32,
        share_deny: u32,
        owner: Vec<u8>,
    },
    Lock {
        handle: FileHandle,
        offset: u64,
        length: u64,
        kind: LockKind,
        owner: Vec<u8>,
    },
    /// Reserved, not active: delegations are never granted by this
    /// server, but the variant exists so the data model matches §3.
    Delegation { handle: FileHandle, owner: Vec<u8> },
}

impl StateKind {
    pub fn state_type(&self) -> StateType {
        match self {
            StateKind::Open { .. } => StateType::Open,
            StateKind::Lock { .. } => StateType::Lock,
            StateKind::Delegation { .. } => StateType::Delegation,
        }
    }
}

/// A state object bound to a client: one [`StateKind`] plus the
/// bookkeeping fields every variant shares.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateRecord {
    pub client_id: String,
    pub seqid: u32,
    pub expiry: Timestamp,
    pub kind: StateKind,
}
