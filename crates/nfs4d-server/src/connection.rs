//! Per-connection accept-loop worker (§4.12).
//!
//! One `std::thread` per accepted connection, per §5's "never async"
//! rule. Each call on the connection is one length-prefixed record:
//! decode the RPC header, resolve the procedure, authenticate, and for
//! `COMPOUND` hand the remaining bytes to [`wire::handle_compound`].
//! `NULL` gets an empty success reply; `MNT` is accepted (clients still
//! probe the mount protocol before NFSv4 proper) but carries no export
//! list beyond the implicit root.

use std::net::TcpStream;
use std::sync::Arc;

use nfs4d_auth::{AuthGate, VerifyOutcome};
use nfs4d_compound::{CompoundContext, CompoundEngine, ConnectionGuard};
use nfs4d_fs::FilesystemOracle;
use nfs4d_locks::LockManager;
use nfs4d_recovery::GracePeriod;
use nfs4d_rpc::{
    read_record, resolve_procedure, write_record, AcceptStat, CallHeader, Decoder, Encoder,
    NfsProcedure, ReplyHeader, ReplyStatus, RpcError,
};
use nfs4d_session::SessionManager;
use tracing::{debug, warn};

use crate::wire;

/// Everything a connection thread needs a reference to, built once at
/// startup and shared across every connection via `Arc`.
pub struct ConnectionContext<F: FilesystemOracle> {
    pub engine: Arc<CompoundEngine<F>>,
    pub auth: Arc<AuthGate>,
    pub sessions: Arc<SessionManager>,
    pub locks: Arc<LockManager>,
    pub grace: Arc<GracePeriod>,
    /// Where a freshly created session's client id goes so the recovery
    /// worker pool can replay its backlog (§4.11, §5). `None` in
    /// contexts that never reconnect clients with a backlog, e.g. tests.
    pub replay_queue: Option<crossbeam_channel::Sender<String>>,
}

/// Serve one accepted connection until the peer closes it or a framing
/// error ends it outright.
pub fn serve_connection<F: FilesystemOracle>(stream: TcpStream, ctx: Arc<ConnectionContext<F>>) {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    let mut reader = match stream.try_clone() {
        Ok(s) => s,
        Err(e) => {
            warn!(%peer, error = %e, "could not clone connection for reading");
            return;
        }
    };
    let mut writer = stream;
    let ctx_ref: &ConnectionContext<F> = &ctx;
    let mut guard: Option<ConnectionGuard<'_>> = None;

    loop {
        let record = match read_record(&mut reader) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => break,
            Err(e) => {
                debug!(%peer, error = %e, "connection closed on a framing error");
                break;
            }
        };

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            process_record(ctx_ref, &record, &mut guard)
        }));
        let reply = match outcome {
            Ok(Some(bytes)) => bytes,
            Ok(None) => break,
            Err(payload) => {
                warn!(%peer, panic = %panic_message(&payload), "connection closed on a panic handling one call");
                break;
            }
        };

        if write_record(&mut writer, &reply).is_err() {
            break;
        }
    }

    drop(guard);
    debug!(%peer, "connection closed");
}

/// Decode and dispatch one call, returning the reply bytes, or `None`
/// if the record didn't even parse as a call header -- at that point
/// there's no xid to reply against, so the connection just ends.
fn process_record<'g, F: FilesystemOracle>(
    ctx: &'g ConnectionContext<F>,
    record: &[u8],
    guard: &mut Option<ConnectionGuard<'g>>,
) -> Option<Vec<u8>> {
    let mut dec = Decoder::new(record);
    let (msg_type, header) = match CallHeader::decode(&mut dec) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "dropping connection on an unparseable call header");
            return None;
        }
    };
    if msg_type != 0 {
        return Some(Vec::new());
    }
    let call_body = &record[record.len() - dec.remaining()..];

    let procedure = match resolve_procedure(header.program, header.version, header.procedure) {
        Ok(p) => p,
        Err(RpcError::ProgUnavail(_)) => return Some(reply_only(header.xid, AcceptStat::ProgUnavail)),
        Err(RpcError::ProcUnavail(_, _)) => return Some(reply_only(header.xid, AcceptStat::ProcUnavail)),
        Err(_) => return Some(reply_only(header.xid, AcceptStat::SystemErr)),
    };

    let (credentials, reply_verifier) = match ctx.auth.verify(&header.cred, &header.verf, call_body) {
        Ok(VerifyOutcome::Authenticated { credentials, reply_verifier }) => (credentials, reply_verifier),
        Ok(VerifyOutcome::ContinueNegotiation { reply_verifier }) => {
            let mut enc = Encoder::new();
            ReplyHeader {
                xid: header.xid,
                status: ReplyStatus::Accepted(AcceptStat::Success),
            }
            .encode(&mut enc);
            reply_verifier.encode(&mut enc);
            return Some(enc.into_bytes());
        }
        Err(e) => {
            debug!(error = %e, "rejecting call on auth failure");
            let mut enc = Encoder::new();
            ReplyHeader {
                xid: header.xid,
                status: ReplyStatus::AuthError,
            }
            .encode(&mut enc);
            return Some(enc.into_bytes());
        }
    };

    if guard.is_none() {
        *guard = Some(ConnectionGuard::new(credentials.holder_id(), &ctx.locks, &ctx.sessions));
    }

    let mut enc = Encoder::new();
    ReplyHeader {
        xid: header.xid,
        status: ReplyStatus::Accepted(AcceptStat::Success),
    }
    .encode(&mut enc);
    reply_verifier.encode(&mut enc);

    match procedure {
        NfsProcedure::Null => {}
        NfsProcedure::Mnt => enc.put_u32(0),
        NfsProcedure::Compound => {
            let mut compound_dec = Decoder::new(call_body);
            let mut cctx = CompoundContext::new(credentials);
            match wire::handle_compound(
                &ctx.engine,
                &mut compound_dec,
                &mut cctx,
                &ctx.sessions,
                &ctx.grace,
                ctx.replay_queue.as_ref(),
            ) {
                Ok(reply) => wire::encode_compound_reply(&mut enc, &reply),
                Err(e) => {
                    debug!(error = %e, "compound arguments failed to decode");
                    return Some(reply_only(header.xid, AcceptStat::GarbageArgs));
                }
            }
        }
    }

    Some(enc.into_bytes())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn reply_only(xid: u32, stat: AcceptStat) -> Vec<u8> {
    let mut enc = Encoder::new();
    ReplyHeader {
        xid,
        status: ReplyStatus::Accepted(stat),
    }
    .encode(&mut enc);
    enc.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use std::net::TcpListener;
    use std::time::Duration;

    use nfs4d_auth::SysCredential;
    use nfs4d_fs::InMemoryFilesystem;
    use nfs4d_handles::{HandleTable, InMemoryHandleTable};
    use nfs4d_journal::{Journal, OperationJournal};
    use nfs4d_recovery::RecoveryMetrics;
    use nfs4d_rpc::OpaqueAuth;
    use nfs4d_state::StateManager;
    use nfs4d_wal::TransactionLog;
    use tempfile::tempdir;

    fn context(dir: &std::path::Path) -> Arc<ConnectionContext<InMemoryFilesystem>> {
        let fs = Arc::new(InMemoryFilesystem::new());
        let handles: Arc<dyn HandleTable> = Arc::new(InMemoryHandleTable::new(dir));
        let locks = Arc::new(LockManager::new(Duration::from_secs(30)));
        let state = Arc::new(StateManager::new(Duration::from_secs(90)));
        let sessions = Arc::new(SessionManager::new(Duration::from_secs(1800)));
        let wal = Arc::new(TransactionLog::open(&dir.join("wal")).unwrap());
        let journal: Arc<dyn OperationJournal> = Arc::new(Journal::open(&dir.join("journal"), wal).unwrap());
        let auth = Arc::new(AuthGate::new());
        let engine = Arc::new(CompoundEngine::new(
            fs,
            handles,
            locks.clone(),
            state,
            sessions.clone(),
            journal,
            auth.clone(),
            None,
        ));
        let grace = Arc::new(GracePeriod::new(Duration::from_secs(60), Arc::new(RecoveryMetrics::new())));
        Arc::new(ConnectionContext {
            engine,
            auth,
            sessions,
            locks,
            grace,
            replay_queue: None,
        })
    }

    fn sys_cred() -> OpaqueAuth {
        OpaqueAuth {
            flavor: nfs4d_rpc::CredFlavor::Sys,
            body: SysCredential {
                stamp: 1,
                machine_name: "test".into(),
                uid: 0,
                gid: 0,
                aux_gids: vec![],
            }
            .encode(),
        }
    }

    fn call_record(program: u32, version: u32, procedure: u32, args: &[u8]) -> Vec<u8> {
        let mut enc = Encoder::new();
        enc.put_u32(1); // xid
        enc.put_u32(0); // msg_type = call
        enc.put_u32(2); // rpc_vers
        enc.put_u32(program);
        enc.put_u32(version);
        enc.put_u32(procedure);
        sys_cred().encode(&mut enc);
        OpaqueAuth::none().encode(&mut enc);
        let mut bytes = enc.into_bytes();
        bytes.extend_from_slice(args);
        bytes
    }

    #[test]
    fn null_call_gets_an_accepted_reply_with_no_body() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            serve_connection(stream, ctx);
        });

        let mut client = TcpStream::connect(addr).unwrap();
        let record = call_record(nfs4d_types::PROGRAM_NFS, nfs4d_types::NFS_V4, 0, &[]);
        write_record(&mut client, &record).unwrap();
        let reply = read_record(&mut client).unwrap().unwrap();
        let mut dec = Decoder::new(&reply);
        assert_eq!(dec.get_u32().unwrap(), 1); // xid
        assert_eq!(dec.get_u32().unwrap(), 1); // msg_type = reply
        assert_eq!(dec.get_u32().unwrap(), 0); // MSG_ACCEPTED
        assert_eq!(dec.get_u32().unwrap(), 0); // SUCCESS

        drop(client);
        handle.join().unwrap();
    }

    #[test]
    fn compound_call_round_trips_put_root_fh() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            serve_connection(stream, ctx);
        });

        let mut args = Encoder::new();
        args.put_string("tag");
        args.put_u32(1);
        args.put_u32(nfs4d_types::NfsOp::PutRootFh as u32);
        let record = call_record(nfs4d_types::PROGRAM_NFS, nfs4d_types::NFS_V4, 1, &args.into_bytes());

        let mut client = TcpStream::connect(addr).unwrap();
        write_record(&mut client, &record).unwrap();
        let reply = read_record(&mut client).unwrap().unwrap();
        let mut dec = Decoder::new(&reply);
        assert_eq!(dec.get_u32().unwrap(), 1); // xid
        assert_eq!(dec.get_u32().unwrap(), 1); // msg_type = reply
        assert_eq!(dec.get_u32().unwrap(), 0); // MSG_ACCEPTED
        assert_eq!(dec.get_u32().unwrap(), 0); // SUCCESS
        OpaqueAuth::decode(&mut dec).unwrap(); // reply verifier
        let _tag = dec.get_string().unwrap();
        let status = dec.get_u32().unwrap();
        assert_eq!(status, nfs4d_types::NfsStatus::Ok as i32 as u32);
        let results_len = dec.get_u32().unwrap();
        assert_eq!(results_len, 1);

        client.flush().unwrap();
        drop(client);
        handle.join().unwrap();
    }
}
