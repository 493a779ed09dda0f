//! Per-opcode COMPOUND argument/result codec.
//!
//! `nfs4d-rpc` deliberately stops at the header/framing/primitive-codec
//! level -- it has "no notion of NFS operations" by design. Something
//! still has to turn one COMPOUND call's argument bytes into
//! [`CompoundOp`] values and turn a [`CompoundReply`] back into bytes;
//! that translation lives here, at the process-wiring layer, rather
//! than in either the wire crate or the compound engine, so neither
//! gains a dependency it doesn't otherwise need.

use nfs4d_compound::{CompoundContext, CompoundEngine, CompoundReply, ExecutedOp, OpResult};
use nfs4d_compound::CompoundOp;
use nfs4d_fs::{AttrChange, DirEntry, FilesystemOracle};
use nfs4d_recovery::GracePeriod;
use nfs4d_rpc::{Decoder, Encoder, RpcError, RpcResult};
use nfs4d_session::SessionManager;
use nfs4d_types::{Fattr4, FileHandle, NfsFileType, NfsOp, NfsStatus};

/// One opcode slot off the wire: either a fully decoded op this core
/// implements, or an opcode it recognizes but does not implement.
enum DecodedOp {
    Supported(CompoundOp),
    Unsupported(NfsOp),
}

fn opcode_from_wire(v: u32) -> RpcResult<NfsOp> {
    Ok(match v {
        3 => NfsOp::Access,
        4 => NfsOp::Close,
        5 => NfsOp::Commit,
        6 => NfsOp::Create,
        7 => NfsOp::DelegPurge,
        8 => NfsOp::DelegReturn,
        9 => NfsOp::GetAttr,
        10 => NfsOp::GetFh,
        11 => NfsOp::Link,
        12 => NfsOp::Lock,
        13 => NfsOp::Lockt,
        14 => NfsOp::Locku,
        15 => NfsOp::Lookup,
        16 => NfsOp::LookupP,
        17 => NfsOp::Nverify,
        18 => NfsOp::Open,
        19 => NfsOp::OpenAttr,
        20 => NfsOp::OpenConfirm,
        21 => NfsOp::OpenDowngrade,
        22 => NfsOp::PutFh,
        23 => NfsOp::PutPubFh,
        24 => NfsOp::PutRootFh,
        25 => NfsOp::Read,
        26 => NfsOp::ReadDir,
        27 => NfsOp::ReadLink,
        28 => NfsOp::Remove,
        29 => NfsOp::Rename,
        30 => NfsOp::Renew,
        31 => NfsOp::RestoreFh,
        32 => NfsOp::SaveFh,
        33 => NfsOp::SecInfo,
        34 => NfsOp::SetAttr,
        35 => NfsOp::SetClientId,
        36 => NfsOp::SetClientIdConfirm,
        37 => NfsOp::Verify,
        38 => NfsOp::Write,
        39 => NfsOp::ReleaseLockOwner,
        43 => NfsOp::CreateSession,
        44 => NfsOp::DestroySession,
        53 => NfsOp::Sequence,
        58 => NfsOp::ReclaimComplete,
        other => return Err(RpcError::GarbageArgs(format!("unrecognized opcode {other}"))),
    })
}

fn file_type_from_wire(v: u32) -> RpcResult<NfsFileType> {
    Ok(match v {
        0 => NfsFileType::Reg,
        1 => NfsFileType::Dir,
        2 => NfsFileType::Lnk,
        3 => NfsFileType::Blk,
        4 => NfsFileType::Chr,
        5 => NfsFileType::Sock,
        6 => NfsFileType::Fifo,
        other => return Err(RpcError::GarbageArgs(format!("unrecognized file type {other}"))),
    })
}

fn file_type_to_wire(t: NfsFileType) -> u32 {
    match t {
        NfsFileType::Reg => 0,
        NfsFileType::Dir => 1,
        NfsFileType::Lnk => 2,
        NfsFileType::Blk => 3,
        NfsFileType::Chr => 4,
        NfsFileType::Sock => 5,
        NfsFileType::Fifo => 6,
    }
}

fn decode_attr_change(dec: &mut Decoder<'_>) -> RpcResult<AttrChange> {
    let mask = dec.get_u32()?;
    let mode = decode_optional_u32(dec)?;
    let uid = decode_optional_u32(dec)?;
    let gid = decode_optional_u32(dec)?;
    let size = decode_optional_u64(dec)?;
    let atime_secs = decode_optional_u64(dec)?;
    let mtime_secs = decode_optional_u64(dec)?;
    Ok(AttrChange {
        mask,
        mode,
        uid,
        gid,
        size,
        atime_secs,
        mtime_secs,
    })
}

fn decode_optional_u32(dec: &mut Decoder<'_>) -> RpcResult<Option<u32>> {
    if dec.get_bool()? {
        Ok(Some(dec.get_u32()?))
    } else {
        Ok(None)
    }
}

fn decode_optional_u64(dec: &mut Decoder<'_>) -> RpcResult<Option<u64>> {
    if dec.get_bool()? {
        Ok(Some(dec.get_u64()?))
    } else {
        Ok(None)
    }
}

fn encode_optional_u32(enc: &mut Encoder, v: Option<u32>) {
    enc.put_bool(v.is_some());
    if let Some(v) = v {
        enc.put_u32(v);
    }
}

fn encode_optional_u64(enc: &mut Encoder, v: Option<u64>) {
    enc.put_bool(v.is_some());
    if let Some(v) = v {
        enc.put_u64(v);
    }
}

fn decode_one_op(dec: &mut Decoder<'_>) -> RpcResult<DecodedOp> {
    let opcode = opcode_from_wire(dec.get_u32()?)?;
    let op = match opcode {
        NfsOp::PutFh => {
            let bytes = dec.get_opaque()?;
            let handle =
                FileHandle::from_slice(&bytes).map_err(|e| RpcError::GarbageArgs(e.to_string()))?;
            CompoundOp::PutFh { handle }
        }
        NfsOp::PutRootFh => CompoundOp::PutRootFh,
        NfsOp::GetFh => CompoundOp::GetFh,
        NfsOp::SaveFh => CompoundOp::SaveFh,
        NfsOp::RestoreFh => CompoundOp::RestoreFh,
        NfsOp::Lookup => CompoundOp::Lookup {
            name: dec.get_string()?,
        },
        NfsOp::GetAttr => CompoundOp::GetAttr { mask: dec.get_u32()? },
        NfsOp::SetAttr => CompoundOp::SetAttr {
            change: decode_attr_change(dec)?,
        },
        NfsOp::Create => {
            let name = dec.get_string()?;
            let file_type = file_type_from_wire(dec.get_u32()?)?;
            let mode = dec.get_u32()?;
            CompoundOp::Create { name, file_type, mode }
        }
        NfsOp::Remove => CompoundOp::Remove {
            name: dec.get_string()?,
        },
        NfsOp::Rename => {
            let old_name = dec.get_string()?;
            let new_name = dec.get_string()?;
            CompoundOp::Rename { old_name, new_name }
        }
        NfsOp::Read => {
            let offset = dec.get_u64()?;
            let count = dec.get_u32()?;
            CompoundOp::Read { offset, count }
        }
        NfsOp::Write => {
            let offset = dec.get_u64()?;
            let data = dec.get_opaque()?;
            let stable = dec.get_bool()?;
            CompoundOp::Write { offset, data, stable }
        }
        NfsOp::ReadDir => {
            let cookie = dec.get_u64()?;
            let maxcount = dec.get_u32()?;
            CompoundOp::ReadDir { cookie, maxcount }
        }
        NfsOp::ReadLink => CompoundOp::ReadLink,
        NfsOp::Symlink => {
            let name = dec.get_string()?;
            let target = dec.get_string()?;
            CompoundOp::Symlink { name, target }
        }
        NfsOp::SetClientId => {
            let client_id = dec.get_string()?;
            let verifier = dec.get_opaque()?;
            CompoundOp::SetClientId { client_id, verifier }
        }
        NfsOp::SetClientIdConfirm => CompoundOp::SetClientIdConfirm {
            client_id: dec.get_string()?,
        },
        NfsOp::CreateSession => CompoundOp::CreateSession {
            client_id: dec.get_string()?,
        },
        NfsOp::DestroySession => CompoundOp::DestroySession {
            session_id: dec.get_u32()?,
        },
        NfsOp::Sequence => {
            let session_id = dec.get_u32()?;
            let seq_id = dec.get_u32()?;
            CompoundOp::Sequence { session_id, seq_id }
        }
        NfsOp::ReclaimComplete => CompoundOp::ReclaimComplete,
        other => return Ok(DecodedOp::Unsupported(other)),
    };
    Ok(DecodedOp::Supported(op))
}

/// Decode one COMPOUND call body: `tag`, then a count-prefixed op list.
fn decode_compound_args(dec: &mut Decoder<'_>) -> RpcResult<(String, Vec<DecodedOp>)> {
    let tag = dec.get_string()?;
    let count = dec.get_u32()? as usize;
    let mut ops = Vec::with_capacity(count);
    for _ in 0..count {
        ops.push(decode_one_op(dec)?);
    }
    Ok((tag, ops))
}

fn encode_fattr4(enc: &mut Encoder, attrs: &Fattr4) {
    enc.put_bool(attrs.file_type.is_some());
    if let Some(t) = attrs.file_type {
        enc.put_u32(file_type_to_wire(t));
    }
    encode_optional_u32(enc, attrs.mode);
    encode_optional_u32(enc, attrs.nlink);
    encode_optional_u32(enc, attrs.uid);
    encode_optional_u32(enc, attrs.gid);
    encode_optional_u64(enc, attrs.size);
    encode_optional_u64(enc, attrs.used);
    encode_optional_u64(enc, attrs.fsid);
    encode_optional_u64(enc, attrs.fileid);
    encode_optional_u64(enc, attrs.atime_secs);
    encode_optional_u64(enc, attrs.mtime_secs);
    encode_optional_u64(enc, attrs.ctime_secs);
}

fn encode_dir_entry(enc: &mut Encoder, entry: &DirEntry) {
    enc.put_string(&entry.name);
    enc.put_u32(file_type_to_wire(entry.file_type));
    enc.put_u64(entry.fileid);
    enc.put_u64(entry.cookie);
}

fn encode_op_result(enc: &mut Encoder, result: &OpResult) {
    match result {
        OpResult::Void => {}
        OpResult::Handle(handle) => enc.put_opaque(handle.as_bytes()),
        OpResult::Attrs(attrs) => encode_fattr4(enc, attrs),
        OpResult::Read { data, eof } => {
            enc.put_opaque(data);
            enc.put_bool(*eof);
        }
        OpResult::Write { count, committed } => {
            enc.put_u32(*count);
            enc.put_bool(*committed);
        }
        OpResult::ReadDir { entries, eof } => {
            enc.put_u32(entries.len() as u32);
            for entry in entries {
                encode_dir_entry(enc, entry);
            }
            enc.put_bool(*eof);
        }
        OpResult::ReadLink { target } => enc.put_string(target),
        OpResult::ClientId => {}
        OpResult::Session { session_id } => enc.put_u32(*session_id),
    }
}

/// Encode a finished compound's reply body: `tag`, overall status, then
/// one `(opcode, status, result?)` triple per executed op.
pub fn encode_compound_reply(enc: &mut Encoder, reply: &CompoundReply) {
    enc.put_string(&reply.tag);
    enc.put_u32(reply.status as i32 as u32);
    enc.put_u32(reply.results.len() as u32);
    for executed in &reply.results {
        enc.put_u32(executed.opcode as u32);
        enc.put_u32(executed.status as i32 as u32);
        let has_result = executed.result.is_some();
        enc.put_bool(has_result);
        if let Some(result) = &executed.result {
            encode_op_result(enc, result);
        }
    }
}

/// Whether the grace period admits this compound's traffic. A compound
/// carrying `RECLAIM_COMPLETE` is always admitted -- that is the
/// reclaim mechanism itself -- and a compound with no leading
/// `SEQUENCE` has no client id to gate on. Otherwise the session's bound
/// client id is looked up and checked against [`GracePeriod::admit`].
fn admitted_by_grace(decoded: &[DecodedOp], sessions: &SessionManager, grace: &GracePeriod) -> NfsStatus {
    let carries_reclaim_complete = decoded
        .iter()
        .any(|op| matches!(op, DecodedOp::Supported(CompoundOp::ReclaimComplete)));
    if carries_reclaim_complete {
        return NfsStatus::Ok;
    }
    let client_id = decoded.iter().find_map(|op| match op {
        DecodedOp::Supported(CompoundOp::Sequence { session_id, .. }) => {
            sessions.client_id_for(*session_id).ok()
        }
        _ => None,
    });
    match client_id {
        Some(client_id) => grace.admit(&client_id),
        None => NfsStatus::Ok,
    }
}

/// Decode and run one COMPOUND call against `engine`, producing the
/// reply to encode back onto the wire.
///
/// Two things can stop a compound before the engine ever sees all of
/// it: the grace period gating this session's client id (§4.11), and an
/// opcode this core recognizes but does not implement, which truncates
/// the compound there with `NOTSUPP` -- the same "first non-OK status
/// stops the compound" rule §4.10 uses for every other failure.
pub fn handle_compound<F: FilesystemOracle>(
    engine: &CompoundEngine<F>,
    dec: &mut Decoder<'_>,
    ctx: &mut CompoundContext,
    sessions: &SessionManager,
    grace: &GracePeriod,
    replay_queue: Option<&crossbeam_channel::Sender<String>>,
) -> RpcResult<CompoundReply> {
    let (tag, decoded) = decode_compound_args(dec)?;

    let grace_status = admitted_by_grace(&decoded, sessions, grace);
    if !grace_status.is_ok() {
        return Ok(CompoundReply {
            tag,
            status: grace_status,
            results: Vec::new(),
        });
    }

    let mut supported = Vec::with_capacity(decoded.len());
    let mut unsupported = None;
    for entry in decoded {
        match entry {
            DecodedOp::Supported(op) => supported.push(op),
            DecodedOp::Unsupported(opcode) => {
                unsupported = Some(opcode);
                break;
            }
        }
    }

    // A freshly created session may have journal entries left over from
    // before this reconnect; hand its client id to the reconnect replay
    // pool (§4.11, §5) rather than replaying inline and stalling this
    // compound on someone else's backlog.
    let new_session_client = supported.iter().find_map(|op| match op {
        CompoundOp::CreateSession { client_id } => Some(client_id.clone()),
        _ => None,
    });

    let mut reply = engine.execute(tag, supported, ctx);
    if let Some(opcode) = unsupported {
        if reply.status.is_ok() {
            reply.status = NfsStatus::Notsupp;
            reply.results.push(ExecutedOp {
                opcode,
                status: NfsStatus::Notsupp,
                result: None,
            });
        }
    }

    if reply.status.is_ok() {
        if let (Some(client_id), Some(tx)) = (new_session_client, replay_queue) {
            let _ = tx.send(client_id);
        }
    }

    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use nfs4d_auth::{AuthGate, Credentials, SysCredential};
    use nfs4d_fs::InMemoryFilesystem;
    use nfs4d_handles::{HandleTable, InMemoryHandleTable};
    use nfs4d_journal::{Journal, OperationJournal};
    use nfs4d_locks::LockManager;
    use nfs4d_recovery::RecoveryMetrics;
    use nfs4d_state::StateManager;
    use nfs4d_wal::TransactionLog;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn harness(dir: &std::path::Path) -> (CompoundEngine<InMemoryFilesystem>, Arc<SessionManager>, Arc<GracePeriod>) {
        let fs = Arc::new(InMemoryFilesystem::new());
        let handles: Arc<dyn HandleTable> = Arc::new(InMemoryHandleTable::new(dir));
        let locks = Arc::new(LockManager::new(Duration::from_secs(30)));
        let state = Arc::new(StateManager::new(Duration::from_secs(90)));
        let sessions = Arc::new(SessionManager::new(Duration::from_secs(1800)));
        let wal = Arc::new(TransactionLog::open(&dir.join("wal")).unwrap());
        let journal: Arc<dyn OperationJournal> = Arc::new(Journal::open(&dir.join("journal"), wal).unwrap());
        let auth = Arc::new(AuthGate::new());
        let engine = CompoundEngine::new(fs, handles, locks, state, sessions.clone(), journal, auth, None);
        let grace = Arc::new(GracePeriod::new(Duration::from_secs(60), Arc::new(RecoveryMetrics::new())));
        (engine, sessions, grace)
    }

    fn ctx() -> CompoundContext {
        CompoundContext::new(Credentials::Sys(SysCredential {
            stamp: 0,
            machine_name: "h".into(),
            uid: 0,
            gid: 0,
            aux_gids: vec![],
        }))
    }

    #[test]
    fn put_root_fh_then_get_fh_round_trips_through_the_wire() {
        let dir = tempdir().unwrap();
        let (engine, sessions, grace) = harness(dir.path());
        let mut enc = Encoder::new();
        enc.put_string("tag");
        enc.put_u32(2);
        enc.put_u32(NfsOp::PutRootFh as u32);
        enc.put_u32(NfsOp::GetFh as u32);
        let bytes = enc.into_bytes();
        let mut dec = Decoder::new(&bytes);
        let mut context = ctx();
        let reply = handle_compound(&engine, &mut dec, &mut context, &sessions, &grace, None).unwrap();
        assert!(reply.status.is_ok());
        assert_eq!(reply.results.len(), 2);
    }

    #[test]
    fn unsupported_opcode_stops_the_compound_with_notsupp() {
        let dir = tempdir().unwrap();
        let (engine, sessions, grace) = harness(dir.path());
        let mut enc = Encoder::new();
        enc.put_string("tag");
        enc.put_u32(2);
        enc.put_u32(NfsOp::PutRootFh as u32);
        enc.put_u32(NfsOp::Open as u32); // recognized, not implemented
        let bytes = enc.into_bytes();
        let mut dec = Decoder::new(&bytes);
        let mut context = ctx();
        let reply = handle_compound(&engine, &mut dec, &mut context, &sessions, &grace, None).unwrap();
        assert_eq!(reply.status, NfsStatus::Notsupp);
        assert_eq!(reply.results.len(), 2);
        assert_eq!(reply.results[1].opcode, NfsOp::Open);
    }

    #[test]
    fn gated_client_is_refused_before_the_engine_runs_its_ops() {
        let dir = tempdir().unwrap();
        let (engine, sessions, grace) = harness(dir.path());
        let session_id = sessions.create("c1");
        sessions.confirm(session_id).unwrap();
        grace.begin(vec!["c1".to_string()]);

        let mut enc = Encoder::new();
        enc.put_string("tag");
        enc.put_u32(1);
        enc.put_u32(NfsOp::Sequence as u32);
        enc.put_u32(session_id);
        enc.put_u32(1);
        let bytes = enc.into_bytes();
        let mut dec = Decoder::new(&bytes);
        let mut context = ctx();
        let reply = handle_compound(&engine, &mut dec, &mut context, &sessions, &grace, None).unwrap();
        assert_eq!(reply.status, NfsStatus::Grace);
        assert!(reply.results.is_empty());
    }
}
