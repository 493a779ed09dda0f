use nfs4d_types::Timestamp;

/// A session bound to a client, tracking the sequence-id high-water
/// mark that enforces exactly-once semantics for session-bound calls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub session_id: u32,
    pub client_id: String,
    pub expiry: Timestamp,
    pub confirmed: bool,
    pub last_seq: Option<u32>,
}
