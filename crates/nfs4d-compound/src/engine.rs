use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::warn;

use nfs4d_auth::AuthGate;
use nfs4d_fs::{AttrChange, FilesystemOracle, FsError, FsResult, OracleAttrs};
use nfs4d_handles::{HandleError, HandleTable};
use nfs4d_journal::{JournalOutcome, MutatingOp, OperationJournal};
use nfs4d_locks::LockManager;
use nfs4d_session::SessionManager;
use nfs4d_state::{StateError, StateManager};
use nfs4d_types::{attr::bitmap, setattr_mask, Fattr4, FileHandle, NfsFileType, NfsStatus};

use crate::context::CompoundContext;
use crate::ops::{CompoundOp, CompoundReply, ExecutedOp, OpResult};

/// Notified when a client concludes its grace-period reclaim via
/// `RECLAIM_COMPLETE`. Defined here rather than in the recovery crate so
/// the compound engine's dependency graph does not point at recovery;
/// the recovery engine implements this and is handed to the compound
/// engine at server startup.
pub trait ReclaimSink: Send + Sync {
    fn reclaim_complete(&self, client_id: &str);
}

/// Wires the compound dispatch loop to every backing component (§4.10).
///
/// `F` is the filesystem oracle's concrete type rather than a trait
/// object so call sites that only ever run against one backend (the
/// real server, or a test harness) avoid a vtable indirection on every
/// op; nothing here depends on which oracle it is, only on the trait.
pub struct CompoundEngine<F: FilesystemOracle> {
    fs: Arc<F>,
    handles: Arc<dyn HandleTable>,
    pub locks: Arc<LockManager>,
    pub state: Arc<StateManager>,
    pub sessions: Arc<SessionManager>,
    journal: Arc<dyn OperationJournal>,
    pub auth: Arc<AuthGate>,
    reclaim: Option<Arc<dyn ReclaimSink>>,
}

impl<F: FilesystemOracle> CompoundEngine<F> {
    pub fn new(
        fs: Arc<F>,
        handles: Arc<dyn HandleTable>,
        locks: Arc<LockManager>,
        state: Arc<StateManager>,
        sessions: Arc<SessionManager>,
        journal: Arc<dyn OperationJournal>,
        auth: Arc<AuthGate>,
        reclaim: Option<Arc<dyn ReclaimSink>>,
    ) -> Self {
        Self {
            fs,
            handles,
            locks,
            state,
            sessions,
            journal,
            auth,
            reclaim,
        }
    }

    /// Run one compound request to completion: initialize the context,
    /// dispatch ops in order, stop at the first non-`Ok` status.
    pub fn execute(&self, tag: String, ops: Vec<CompoundOp>, ctx: &mut CompoundContext) -> CompoundReply {
        let mut results = Vec::with_capacity(ops.len());
        let mut compound_status = NfsStatus::Ok;

        for op in ops {
            let opcode = op.opcode();
            let (status, result) = self.dispatch(op, ctx);
            ctx.status = status;
            let executed = ExecutedOp {
                opcode,
                status,
                result: if status.is_ok() { result } else { None },
            };
            let stop = !status.is_ok();
            results.push(executed);
            if stop {
                compound_status = status;
                break;
            }
        }

        CompoundReply {
            tag,
            status: compound_status,
            results,
        }
    }

    fn dispatch(&self, op: CompoundOp, ctx: &mut CompoundContext) -> (NfsStatus, Option<OpResult>) {
        match op {
            CompoundOp::PutFh { handle } => self.put_fh(handle, ctx),
            CompoundOp::PutRootFh => self.put_root_fh(ctx),
            CompoundOp::GetFh => self.get_fh(ctx),
            CompoundOp::SaveFh => self.save_fh(ctx),
            CompoundOp::RestoreFh => self.restore_fh(ctx),
            CompoundOp::Lookup { name } => self.lookup(&name, ctx),
            CompoundOp::GetAttr { mask } => self.getattr(mask, ctx),
            CompoundOp::SetAttr { change } => self.setattr(change, ctx),
            CompoundOp::Create { name, file_type, mode } => self.create(&name, file_type, mode, ctx),
            CompoundOp::Remove { name } => self.remove(&name, ctx),
            CompoundOp::Rename { old_name, new_name } => self.rename(&old_name, &new_name, ctx),
            CompoundOp::Read { offset, count } => self.read(offset, count, ctx),
            CompoundOp::Write { offset, data, stable } => self.write(offset, &data, stable, ctx),
            CompoundOp::ReadDir { cookie, maxcount } => self.readdir(cookie, maxcount, ctx),
            CompoundOp::ReadLink => self.readlink(ctx),
            CompoundOp::Symlink { name, target } => self.symlink(&name, &target, ctx),
            CompoundOp::SetClientId { client_id, verifier } => self.set_client_id(&client_id, &verifier),
            CompoundOp::SetClientIdConfirm { client_id } => self.set_client_id_confirm(&client_id),
            CompoundOp::CreateSession { client_id } => self.create_session(&client_id),
            CompoundOp::DestroySession { session_id } => self.destroy_session(session_id),
            CompoundOp::Sequence { session_id, seq_id } => self.sequence(session_id, seq_id, ctx),
            CompoundOp::ReclaimComplete => self.reclaim_complete(ctx),
        }
    }

    fn reclaim_complete(&self, ctx: &CompoundContext) -> (NfsStatus, Option<OpResult>) {
        if let Some(sink) = &self.reclaim {
            let client_id = ctx.client_id.clone().unwrap_or_else(|| ctx.holder_id());
            sink.reclaim_complete(&client_id);
        }
        (NfsStatus::Ok, Some(OpResult::Void))
    }

    // -- filehandle bookkeeping ------------------------------------------------

    fn put_fh(&self, handle: FileHandle, ctx: &mut CompoundContext) -> (NfsStatus, Option<OpResult>) {
        match self.handles.path_for_handle(&handle) {
            Ok(_) => {
                ctx.current_fh = Some(handle);
                (NfsStatus::Ok, Some(OpResult::Void))
            }
            Err(HandleError::Stale) => (NfsStatus::Stale, None),
            Err(HandleError::Collision(_)) => (NfsStatus::Serverfault, None),
        }
    }

    fn put_root_fh(&self, ctx: &mut CompoundContext) -> (NfsStatus, Option<OpResult>) {
        ctx.current_fh = Some(self.handles.root_handle());
        (NfsStatus::Ok, Some(OpResult::Void))
    }

    fn get_fh(&self, ctx: &CompoundContext) -> (NfsStatus, Option<OpResult>) {
        match ctx.current_fh {
            Some(h) => (NfsStatus::Ok, Some(OpResult::Handle(h))),
            None => (NfsStatus::NoFileHandle, None),
        }
    }

    fn save_fh(&self, ctx: &mut CompoundContext) -> (NfsStatus, Option<OpResult>) {
        match ctx.current_fh {
            Some(h) => {
                ctx.saved_fh = Some(h);
                (NfsStatus::Ok, Some(OpResult::Void))
            }
            None => (NfsStatus::NoFileHandle, None),
        }
    }

    fn restore_fh(&self, ctx: &mut CompoundContext) -> (NfsStatus, Option<OpResult>) {
        match ctx.saved_fh {
            Some(h) => {
                ctx.current_fh = Some(h);
                (NfsStatus::Ok, Some(OpResult::Void))
            }
            None => (NfsStatus::RestoreFh, None),
        }
    }

    // -- namespace operations ---------------------------------------------------

    fn lookup(&self, name: &str, ctx: &mut CompoundContext) -> (NfsStatus, Option<OpResult>) {
        let dir = match self.current_path(ctx) {
            Ok(p) => p,
            Err(s) => return (s, None),
        };
        if !nfs4d_handles::validate_component(name) {
            return (NfsStatus::Nametoolong, None);
        }
        if !self.fs.is_dir(&dir) {
            return (NfsStatus::Notdir, None);
        }
        let child = dir.join(name);
        if !self.fs.exists(&child) {
            return (NfsStatus::Noent, None);
        }
        match self.handles.handle_for_path(&child) {
            Ok(h) => {
                ctx.current_fh = Some(h);
                (NfsStatus::Ok, Some(OpResult::Handle(h)))
            }
            Err(HandleError::Collision(_)) => (NfsStatus::Serverfault, None),
            Err(HandleError::Stale) => (NfsStatus::Stale, None),
        }
    }

    fn getattr(&self, mask: u32, ctx: &CompoundContext) -> (NfsStatus, Option<OpResult>) {
        let path = match self.current_path(ctx) {
            Ok(p) => p,
            Err(s) => return (s, None),
        };
        match self.fs.getattr(&path) {
            Ok(attrs) => (NfsStatus::Ok, Some(OpResult::Attrs(to_fattr4(attrs).masked(mask)))),
            Err(e) => (fs_error_to_status(&e), None),
        }
    }

    fn setattr(&self, change: AttrChange, ctx: &CompoundContext) -> (NfsStatus, Option<OpResult>) {
        let path = match self.current_path(ctx) {
            Ok(p) => p,
            Err(s) => return (s, None),
        };
        let op = MutatingOp::SetAttr {
            path: path_string(&path),
            change,
        };
        let pre_state = match self.fs.getattr(&path) {
            Ok(old) => bincode::serialize(&undo_change(&change, old)).unwrap_or_default(),
            Err(_) => Vec::new(),
        };
        match self.run_mutating(op, ctx.client_id.clone(), pre_state, || self.fs.setattr(&path, &change)) {
            Ok(attrs) => (NfsStatus::Ok, Some(OpResult::Attrs(to_fattr4(attrs)))),
            Err(s) => (s, None),
        }
    }

    fn create(
        &self,
        name: &str,
        file_type: NfsFileType,
        mode: u32,
        ctx: &mut CompoundContext,
    ) -> (NfsStatus, Option<OpResult>) {
        let dir = match self.current_path(ctx) {
            Ok(p) => p,
            Err(s) => return (s, None),
        };
        if !nfs4d_handles::validate_component(name) {
            return (NfsStatus::Nametoolong, None);
        }
        let child = dir.join(name);
        let child_s = path_string(&child);
        let result = match file_type {
            NfsFileType::Reg => {
                let op = MutatingOp::Create {
                    path: child_s.clone(),
                    file_type,
                    mode,
                };
                self.run_mutating(op, ctx.client_id.clone(), Vec::new(), || self.fs.create_file(&child, mode))
            }
            NfsFileType::Dir => {
                let op = MutatingOp::Mkdir {
                    path: child_s.clone(),
                    mode,
                };
                self.run_mutating(op, ctx.client_id.clone(), Vec::new(), || self.fs.mkdir(&child, mode))
            }
            _ => return (NfsStatus::Notsupp, None),
        };
        match result {
            Ok(()) => match self.handles.handle_for_path(&child) {
                Ok(h) => {
                    ctx.current_fh = Some(h);
                    (NfsStatus::Ok, Some(OpResult::Handle(h)))
                }
                Err(_) => (NfsStatus::Serverfault, None),
            },
            Err(s) => (s, None),
        }
    }

    fn remove(&self, name: &str, ctx: &CompoundContext) -> (NfsStatus, Option<OpResult>) {
        let dir = match self.current_path(ctx) {
            Ok(p) => p,
            Err(s) => return (s, None),
        };
        let child = dir.join(name);
        let child_s = path_string(&child);
        let is_dir = self.fs.is_dir(&child);
        let result = if is_dir {
            let op = MutatingOp::Rmdir { path: child_s };
            self.run_mutating(op, ctx.client_id.clone(), Vec::new(), || self.fs.rmdir(&child))
        } else {
            let op = MutatingOp::Remove { path: child_s };
            self.run_mutating(op, ctx.client_id.clone(), Vec::new(), || self.fs.remove_file(&child))
        };
        match result {
            Ok(()) => {
                self.handles.forget(&child);
                (NfsStatus::Ok, Some(OpResult::Void))
            }
            Err(s) => (s, None),
        }
    }

    fn rename(&self, old_name: &str, new_name: &str, ctx: &CompoundContext) -> (NfsStatus, Option<OpResult>) {
        let src_dir = match ctx.saved_fh {
            Some(h) => match self.handles.path_for_handle(&h) {
                Ok(p) => p,
                Err(_) => return (NfsStatus::Stale, None),
            },
            None => return (NfsStatus::NoFileHandle, None),
        };
        let dst_dir = match self.current_path(ctx) {
            Ok(p) => p,
            Err(s) => return (s, None),
        };
        let old_path = src_dir.join(old_name);
        let new_path = dst_dir.join(new_name);
        let op = MutatingOp::Rename {
            old: path_string(&old_path),
            new: path_string(&new_path),
        };
        match self.run_mutating(op, ctx.client_id.clone(), Vec::new(), || self.fs.rename(&old_path, &new_path)) {
            Ok(()) => {
                let _ = self.handles.rename(&old_path, &new_path);
                (NfsStatus::Ok, Some(OpResult::Void))
            }
            Err(s) => (s, None),
        }
    }

    fn read(&self, offset: u64, count: u32, ctx: &CompoundContext) -> (NfsStatus, Option<OpResult>) {
        let path = match self.current_path(ctx) {
            Ok(p) => p,
            Err(s) => return (s, None),
        };
        match self.fs.read(&path, offset, count) {
            Ok((data, eof)) => (NfsStatus::Ok, Some(OpResult::Read { data, eof })),
            Err(e) => (fs_error_to_status(&e), None),
        }
    }

    fn write(&self, offset: u64, data: &[u8], stable: bool, ctx: &CompoundContext) -> (NfsStatus, Option<OpResult>) {
        let path = match self.current_path(ctx) {
            Ok(p) => p,
            Err(s) => return (s, None),
        };
        let pre_state = self.fs.read_full(&path).unwrap_or_default();
        let op = MutatingOp::Write {
            path: path_string(&path),
            offset,
            data: data.to_vec(),
            stable,
        };
        match self.run_mutating(op, ctx.client_id.clone(), pre_state, || self.fs.write(&path, offset, data, stable)) {
            Ok((count, committed)) => (NfsStatus::Ok, Some(OpResult::Write { count, committed })),
            Err(s) => (s, None),
        }
    }

    fn readdir(&self, cookie: u64, maxcount: u32, ctx: &CompoundContext) -> (NfsStatus, Option<OpResult>) {
        let path = match self.current_path(ctx) {
            Ok(p) => p,
            Err(s) => return (s, None),
        };
        match self.fs.readdir(&path, cookie, maxcount) {
            Ok((entries, eof)) => (NfsStatus::Ok, Some(OpResult::ReadDir { entries, eof })),
            Err(e) => (fs_error_to_status(&e), None),
        }
    }

    fn readlink(&self, ctx: &CompoundContext) -> (NfsStatus, Option<OpResult>) {
        let path = match self.current_path(ctx) {
            Ok(p) => p,
            Err(s) => return (s, None),
        };
        match self.fs.readlink(&path) {
            Ok(target) => (NfsStatus::Ok, Some(OpResult::ReadLink { target })),
            Err(e) => (fs_error_to_status(&e), None),
        }
    }

    fn symlink(&self, name: &str, target: &str, ctx: &mut CompoundContext) -> (NfsStatus, Option<OpResult>) {
        let dir = match self.current_path(ctx) {
            Ok(p) => p,
            Err(s) => return (s, None),
        };
        if !nfs4d_handles::validate_component(name) {
            return (NfsStatus::Nametoolong, None);
        }
        let link_path = dir.join(name);
        let op = MutatingOp::Symlink {
            target: target.to_string(),
            link_path: path_string(&link_path),
        };
        let target = target.to_string();
        match self.run_mutating(op, ctx.client_id.clone(), Vec::new(), || self.fs.symlink(&target, &link_path)) {
            Ok(()) => match self.handles.handle_for_path(&link_path) {
                Ok(h) => {
                    ctx.current_fh = Some(h);
                    (NfsStatus::Ok, Some(OpResult::Handle(h)))
                }
                Err(_) => (NfsStatus::Serverfault, None),
            },
            Err(s) => (s, None),
        }
    }

    // -- client/session/reclaim --------------------------------------------------

    fn set_client_id(&self, client_id: &str, verifier: &[u8]) -> (NfsStatus, Option<OpResult>) {
        match self.state.register(client_id, verifier) {
            Ok(()) => (NfsStatus::Ok, Some(OpResult::ClientId)),
            Err(StateError::ClientIdInUse) => (NfsStatus::ClidInuse, None),
            Err(_) => (NfsStatus::Serverfault, None),
        }
    }

    fn set_client_id_confirm(&self, client_id: &str) -> (NfsStatus, Option<OpResult>) {
        match self.state.confirm(client_id) {
            Ok(()) => (NfsStatus::Ok, Some(OpResult::Void)),
            Err(StateError::UnknownClient) => (NfsStatus::StaleClientid, None),
            Err(_) => (NfsStatus::Serverfault, None),
        }
    }

    fn create_session(&self, client_id: &str) -> (NfsStatus, Option<OpResult>) {
        if !self.state.is_known(client_id) {
            return (NfsStatus::StaleClientid, None);
        }
        let session_id = self.sessions.create(client_id);
        (NfsStatus::Ok, Some(OpResult::Session { session_id }))
    }

    fn destroy_session(&self, session_id: u32) -> (NfsStatus, Option<OpResult>) {
        match self.sessions.destroy(session_id) {
            Ok(()) => (NfsStatus::Ok, Some(OpResult::Void)),
            Err(_) => (NfsStatus::Stale, None),
        }
    }

    fn sequence(&self, session_id: u32, seq_id: u32, ctx: &mut CompoundContext) -> (NfsStatus, Option<OpResult>) {
        match self.sessions.check_sequence(session_id, seq_id) {
            Ok(true) => match self.sessions.update_sequence(session_id, seq_id) {
                Ok(()) => {
                    ctx.client_id = self.sessions.client_id_for(session_id).ok();
                    (NfsStatus::Ok, Some(OpResult::Void))
                }
                Err(_) => (NfsStatus::SeqMisordered, None),
            },
            Ok(false) => (NfsStatus::SeqMisordered, None),
            Err(_) => (NfsStatus::Stale, None),
        }
    }

    // -- shared plumbing ----------------------------------------------------

    fn current_path(&self, ctx: &CompoundContext) -> Result<PathBuf, NfsStatus> {
        let handle = ctx.current_fh.ok_or(NfsStatus::NoFileHandle)?;
        self.handles.path_for_handle(&handle).map_err(|_| NfsStatus::Stale)
    }

    /// Wraps a filesystem mutation in the append/pre-state/mutate/complete
    /// cycle every mutating op must go through (§4.10).
    fn run_mutating<T>(
        &self,
        op: MutatingOp,
        client_id: Option<String>,
        pre_state: Vec<u8>,
        apply: impl FnOnce() -> FsResult<T>,
    ) -> Result<T, NfsStatus> {
        let seq = match self.journal.append(&op, client_id) {
            Ok(seq) => seq,
            Err(e) => {
                warn!(error = %e, "journal append failed");
                return Err(NfsStatus::Serverfault);
            }
        };
        if !pre_state.is_empty() {
            if let Err(e) = self.journal.begin_state_transition(seq, pre_state) {
                warn!(error = %e, "journal pre-state capture failed");
                return Err(NfsStatus::Serverfault);
            }
        }
        match apply() {
            Ok(value) => {
                if let Err(e) = self.journal.complete(seq, JournalOutcome::Success) {
                    warn!(error = %e, "journal commit failed");
                    return Err(NfsStatus::Serverfault);
                }
                Ok(value)
            }
            Err(e) => {
                let _ = self.journal.complete(seq, JournalOutcome::Failed(e.to_string()));
                Err(fs_error_to_status(&e))
            }
        }
    }
}

fn path_string(p: &Path) -> String {
    p.to_string_lossy().into_owned()
}

fn to_fattr4(a: OracleAttrs) -> Fattr4 {
    Fattr4 {
        file_type: a.file_type,
        mode: Some(a.mode),
        nlink: Some(a.nlink),
        uid: Some(a.uid),
        gid: Some(a.gid),
        size: Some(a.size),
        used: Some(a.used),
        fsid: None,
        fileid: Some(a.fileid),
        atime_secs: Some(a.atime_secs),
        mtime_secs: Some(a.mtime_secs),
        ctime_secs: Some(a.ctime_secs),
    }
}

/// Build the `AttrChange` that would undo `new` back to `old`, restricted
/// to the fields `new.mask` actually touched -- the pre-state recovery
/// replays through `setattr` on rollback.
fn undo_change(new: &AttrChange, old: OracleAttrs) -> AttrChange {
    AttrChange {
        mask: new.mask,
        mode: (new.mask & setattr_mask::MODE != 0).then_some(old.mode),
        uid: (new.mask & setattr_mask::UID != 0).then_some(old.uid),
        gid: (new.mask & setattr_mask::GID != 0).then_some(old.gid),
        size: (new.mask & setattr_mask::SIZE != 0).then_some(old.size),
        atime_secs: (new.mask & setattr_mask::ATIME != 0).then_some(old.atime_secs),
        mtime_secs: (new.mask & setattr_mask::MTIME != 0).then_some(old.mtime_secs),
    }
}

pub fn fs_error_to_status(e: &FsError) -> NfsStatus {
    match e {
        FsError::NotFound(_) => NfsStatus::Noent,
        FsError::NotDirectory(_) => NfsStatus::Notdir,
        FsError::IsDirectory(_) => NfsStatus::Isdir,
        FsError::NotEmpty(_) => NfsStatus::Notempty,
        FsError::AlreadyExists(_) => NfsStatus::Exist,
        FsError::CrossDevice(_, _) => NfsStatus::Xdev,
        FsError::Io(err) => NfsStatus::from_io_error(err),
    }
}

// `bitmap`/`setattr_mask` are re-exported at the crate root for callers
// building `GETATTR`/`SETATTR` masks without reaching into `nfs4d_types`.
pub use nfs4d_types::attr::bitmap as attr_bitmap;
pub use nfs4d_types::setattr_mask as attr_setattr_mask;

#[cfg(test)]
mod tests {
    use super::*;
    use nfs4d_auth::{AuthGate, Credentials, SysCredential};
    use nfs4d_fs::InMemoryFilesystem;
    use nfs4d_handles::InMemoryHandleTable;
    use nfs4d_journal::Journal;
    use nfs4d_wal::TransactionLog;
    use std::time::Duration;
    use tempfile::tempdir;

    fn harness(dir: &Path) -> (CompoundEngine<InMemoryFilesystem>, CompoundContext) {
        let fs = Arc::new(InMemoryFilesystem::new());
        let handles: Arc<dyn HandleTable> = Arc::new(InMemoryHandleTable::new(Path::new("/")));
        let wal = Arc::new(TransactionLog::open(&dir.join("wal")).unwrap());
        let journal: Arc<dyn OperationJournal> = Arc::new(Journal::open(&dir.join("journal"), wal).unwrap());
        let engine = CompoundEngine::new(
            fs,
            handles,
            Arc::new(LockManager::new(Duration::from_secs(30))),
            Arc::new(StateManager::new(Duration::from_secs(90))),
            Arc::new(SessionManager::new(Duration::from_secs(1800))),
            journal,
            Arc::new(AuthGate::new()),
            None,
        );
        let ctx = CompoundContext::new(Credentials::Sys(SysCredential {
            stamp: 0,
            machine_name: "h".into(),
            uid: 0,
            gid: 0,
            aux_gids: vec![],
        }));
        (engine, ctx)
    }

    #[test]
    fn create_write_getattr_round_trip() {
        let dir = tempdir().unwrap();
        let (engine, mut ctx) = harness(dir.path());
        let reply = engine.execute(
            "t".into(),
            vec![
                CompoundOp::PutRootFh,
                CompoundOp::Create {
                    name: "a".into(),
                    file_type: NfsFileType::Reg,
                    mode: 0o644,
                },
                CompoundOp::Write {
                    offset: 0,
                    data: b"hello".to_vec(),
                    stable: true,
                },
                CompoundOp::GetAttr { mask: bitmap::SIZE },
            ],
            &mut ctx,
        );
        assert_eq!(reply.status, NfsStatus::Ok);
        assert_eq!(reply.results.len(), 4);
        match &reply.results[3].result {
            Some(OpResult::Attrs(attrs)) => assert_eq!(attrs.size, Some(5)),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn lookup_missing_stops_compound_and_keeps_prefix() {
        let dir = tempdir().unwrap();
        let (engine, mut ctx) = harness(dir.path());
        let reply = engine.execute(
            "t".into(),
            vec![
                CompoundOp::PutRootFh,
                CompoundOp::Lookup { name: "missing".into() },
                CompoundOp::GetAttr { mask: bitmap::SIZE },
            ],
            &mut ctx,
        );
        assert_eq!(reply.status, NfsStatus::Noent);
        assert_eq!(reply.results.len(), 2);
    }

    #[test]
    fn zero_op_compound_is_ok_with_empty_results() {
        let dir = tempdir().unwrap();
        let (engine, mut ctx) = harness(dir.path());
        let reply = engine.execute("t".into(), vec![], &mut ctx);
        assert_eq!(reply.status, NfsStatus::Ok);
        assert!(reply.results.is_empty());
    }

    #[test]
    fn restorefh_without_savefh_fails() {
        let dir = tempdir().unwrap();
        let (engine, mut ctx) = harness(dir.path());
        let reply = engine.execute(
            "t".into(),
            vec![CompoundOp::PutRootFh, CompoundOp::RestoreFh],
            &mut ctx,
        );
        assert_eq!(reply.status, NfsStatus::RestoreFh);
    }

    #[test]
    fn remove_nonexistent_is_noent() {
        let dir = tempdir().unwrap();
        let (engine, mut ctx) = harness(dir.path());
        let reply = engine.execute(
            "t".into(),
            vec![CompoundOp::PutRootFh, CompoundOp::Remove { name: "nope".into() }],
            &mut ctx,
        );
        assert_eq!(reply.status, NfsStatus::Noent);
    }

    #[test]
    fn set_client_id_then_confirm_then_create_session() {
        let dir = tempdir().unwrap();
        let (engine, _ctx) = harness(dir.path());
        let (status, _) = engine.set_client_id("c1", &[0xAA, 0xBB]);
        assert_eq!(status, NfsStatus::Ok);
        let (status, _) = engine.set_client_id_confirm("c1");
        assert_eq!(status, NfsStatus::Ok);
        let (status, result) = engine.create_session("c1");
        assert_eq!(status, NfsStatus::Ok);
        assert!(matches!(result, Some(OpResult::Session { .. })));
    }

    #[test]
    fn sequence_tags_context_with_client_id_for_replay() {
        let dir = tempdir().unwrap();
        let (engine, mut ctx) = harness(dir.path());
        engine.set_client_id("c1", &[0xAA]);
        engine.set_client_id_confirm("c1");
        let (_, result) = engine.create_session("c1");
        let session_id = match result {
            Some(OpResult::Session { session_id }) => session_id,
            other => panic!("unexpected result {other:?}"),
        };

        assert!(ctx.client_id.is_none());
        let reply = engine.execute(
            "t".into(),
            vec![
                CompoundOp::Sequence { session_id, seq_id: 1 },
                CompoundOp::PutRootFh,
                CompoundOp::Create {
                    name: "a".into(),
                    file_type: NfsFileType::Reg,
                    mode: 0o644,
                },
            ],
            &mut ctx,
        );
        assert_eq!(reply.status, NfsStatus::Ok);
        assert_eq!(ctx.client_id.as_deref(), Some("c1"));
    }
}
