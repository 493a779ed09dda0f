use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tracing::{debug, warn};

use nfs4d_types::{MutatingProcedure, Timestamp};

use crate::error::{WalError, WalResult};
use crate::record::{UncommittedTxn, WalRecord};

/// Length+CRC header: 4 bytes little-endian length, 4 bytes little-endian
/// CRC32 of the payload.
const HEADER_SIZE: usize = 8;

struct TxnState {
    procedure: MutatingProcedure,
    args: Vec<u8>,
    pre_state: Option<Vec<u8>>,
    timestamp: Timestamp,
}

struct Writer {
    file: File,
}

/// The append-only write-ahead transaction log.
///
/// Every mutating compound op wraps its filesystem effect in
/// `begin`/`save_pre_state`/`commit` (or `rollback`). A transaction is
/// durable once its `Commit` record has been forced to stable storage,
/// which [`TransactionLog::commit`] guarantees before returning.
pub struct TransactionLog {
    path: PathBuf,
    writer: Mutex<Writer>,
    next_txn_id: AtomicU64,
    /// Transactions observed with a `Begin` but no `Commit`, either from
    /// this process's own writes or reloaded from disk at `open`.
    index: Mutex<HashMap<u64, TxnState>>,
}

impl TransactionLog {
    /// Open (or create) the log at `path`, replaying its existing
    /// contents into memory so `txn_id` allocation resumes monotonically
    /// and `recover()` can see transactions begun before this process
    /// started.
    pub fn open(path: &Path) -> WalResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let records = Self::read_all_records(path)?;
        let mut index: HashMap<u64, TxnState> = HashMap::new();
        let mut max_txn_id = 0u64;
        for record in records {
            max_txn_id = max_txn_id.max(record.txn_id());
            match record {
                WalRecord::Begin {
                    txn_id,
                    procedure,
                    args,
                    timestamp,
                } => {
                    index.insert(
                        txn_id,
                        TxnState {
                            procedure,
                            args,
                            pre_state: None,
                            timestamp,
                        },
                    );
                }
                WalRecord::PreState {
                    txn_id, pre_state, ..
                } => {
                    if let Some(entry) = index.get_mut(&txn_id) {
                        entry.pre_state = Some(pre_state);
                    }
                }
                WalRecord::Commit { txn_id, .. } => {
                    index.remove(&txn_id);
                }
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        debug!(
            path = %path.display(),
            uncommitted = index.len(),
            next_txn_id = max_txn_id + 1,
            "opened transaction log"
        );

        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(Writer { file }),
            next_txn_id: AtomicU64::new(max_txn_id + 1),
            index: Mutex::new(index),
        })
    }

    /// Begin a transaction: allocate a fresh `txn_id` and append an
    /// uncommitted `Begin` record.
    pub fn begin(&self, procedure: MutatingProcedure, args: Vec<u8>) -> WalResult<u64> {
        let txn_id = self.next_txn_id.fetch_add(1, Ordering::SeqCst);
        let timestamp = Timestamp::now();
        let record = WalRecord::Begin {
            txn_id,
            procedure,
            args: args.clone(),
            timestamp,
        };
        self.append_record(&record, false)?;
        self.index.lock().expect("wal index poisoned").insert(
            txn_id,
            TxnState {
                procedure,
                args,
                pre_state: None,
                timestamp,
            },
        );
        Ok(txn_id)
    }

    /// Attach the bytes needed to undo `txn_id`'s effect.
    pub fn save_pre_state(&self, txn_id: u64, bytes: Vec<u8>) -> WalResult<()> {
        {
            let mut index = self.index.lock().expect("wal index poisoned");
            let entry = index.get_mut(&txn_id).ok_or(WalError::UnknownTxn(txn_id))?;
            entry.pre_state = Some(bytes.clone());
        }
        let record = WalRecord::PreState {
            txn_id,
            pre_state: bytes,
            timestamp: Timestamp::now(),
        };
        self.append_record(&record, false)
    }

    /// Append a `Commit` record and force it to stable storage before
    /// returning, per the durability guarantee: a committed transaction's
    /// effect survives a power loss immediately following this call.
    pub fn commit(&self, txn_id: u64) -> WalResult<()> {
        {
            let index = self.index.lock().expect("wal index poisoned");
            if !index.contains_key(&txn_id) {
                return Err(WalError::UnknownTxn(txn_id));
            }
        }
        let record = WalRecord::Commit {
            txn_id,
            timestamp: Timestamp::now(),
        };
        self.append_record(&record, true)?;
        self.index.lock().expect("wal index poisoned").remove(&txn_id);
        Ok(())
    }

    /// Drop the in-memory entry for `txn_id`. Its pre-state bytes, if
    /// saved, remain on disk for crash recovery; no new record is
    /// appended since an uncommitted `Begin` already marks it for undo.
    pub fn rollback(&self, txn_id: u64) -> WalResult<()> {
        self.index.lock().expect("wal index poisoned").remove(&txn_id);
        Ok(())
    }

    /// Force the log file to stable storage.
    pub fn sync(&self) -> WalResult<()> {
        let writer = self.writer.lock().expect("wal writer poisoned");
        writer.file.sync_all()?;
        Ok(())
    }

    /// Every transaction with a `Begin` but no `Commit` record, in
    /// ascending `txn_id` order.
    pub fn recover(&self) -> WalResult<Vec<UncommittedTxn>> {
        let index = self.index.lock().expect("wal index poisoned");
        let mut out: Vec<UncommittedTxn> = index
            .iter()
            .map(|(&txn_id, entry)| UncommittedTxn {
                txn_id,
                procedure: entry.procedure,
                args: entry.args.clone(),
                pre_state: entry.pre_state.clone(),
                timestamp: entry.timestamp,
            })
            .collect();
        out.sort_by_key(|t| t.txn_id);
        Ok(out)
    }

    /// Rewrite the log to contain only the `Begin`(+`PreState`) records
    /// for transactions still in `keep`, truncating everything else.
    /// Called after recovery resolves every in-flight transaction
    /// (normally with an empty `keep`, and always on clean shutdown).
    pub fn compact(&self, keep: &[u64]) -> WalResult<()> {
        let keep: std::collections::HashSet<u64> = keep.iter().copied().collect();
        let mut writer = self.writer.lock().expect("wal writer poisoned");
        let mut index = self.index.lock().expect("wal index poisoned");
        index.retain(|txn_id, _| keep.contains(txn_id));

        let tmp_path = self.path.with_extension("compact.tmp");
        {
            let mut tmp = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)?;
            let mut entries: Vec<(&u64, &TxnState)> = index.iter().collect();
            entries.sort_by_key(|(txn_id, _)| **txn_id);
            for (&txn_id, entry) in entries {
                Self::write_record(
                    &mut tmp,
                    &WalRecord::Begin {
                        txn_id,
                        procedure: entry.procedure,
                        args: entry.args.clone(),
                        timestamp: entry.timestamp,
                    },
                )?;
                if let Some(pre_state) = &entry.pre_state {
                    Self::write_record(
                        &mut tmp,
                        &WalRecord::PreState {
                            txn_id,
                            pre_state: pre_state.clone(),
                            timestamp: entry.timestamp,
                        },
                    )?;
                }
            }
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        writer.file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;
        debug!(remaining = index.len(), "compacted transaction log");
        Ok(())
    }

    fn append_record(&self, record: &WalRecord, force_sync: bool) -> WalResult<()> {
        let mut writer = self.writer.lock().expect("wal writer poisoned");
        Self::write_record(&mut writer.file, record)?;
        if force_sync {
            writer.file.sync_all()?;
        } else {
            writer.file.flush()?;
        }
        Ok(())
    }

    fn write_record(file: &mut File, record: &WalRecord) -> WalResult<()> {
        let payload =
            bincode::serialize(record).map_err(|e| WalError::Serialization(e.to_string()))?;
        let length = payload.len() as u32;
        let crc = crc32fast::hash(&payload);
        file.write_all(&length.to_le_bytes())?;
        file.write_all(&crc.to_le_bytes())?;
        file.write_all(&payload)?;
        Ok(())
    }

    /// Parse every well-formed record from `path` front to back. An
    /// incomplete or CRC-mismatched tail record (a torn write from a
    /// crash) is treated as absent rather than an error.
    fn read_all_records(path: &Path) -> WalResult<Vec<WalRecord>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);
        let mut records = Vec::new();
        let mut offset: u64 = 0;

        while offset + HEADER_SIZE as u64 <= file_len {
            let mut header = [0u8; HEADER_SIZE];
            match reader.read_exact(&mut header) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }
            let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
            let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

            if length == 0 || offset + HEADER_SIZE as u64 + length as u64 > file_len {
                warn!(offset, length, "truncated WAL record; stopping scan");
                break;
            }

            let mut payload = vec![0u8; length as usize];
            match reader.read_exact(&mut payload) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    warn!(offset, "truncated WAL payload; stopping scan");
                    break;
                }
                Err(e) => return Err(e.into()),
            }

            let actual_crc = crc32fast::hash(&payload);
            if actual_crc != expected_crc {
                warn!(offset, "CRC mismatch on WAL record; stopping scan");
                break;
            }

            match bincode::deserialize::<WalRecord>(&payload) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(offset, error = %e, "failed to decode WAL record; stopping scan");
                    break;
                }
            }

            offset += HEADER_SIZE as u64 + length as u64;
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn log_at(dir: &std::path::Path) -> TransactionLog {
        TransactionLog::open(&dir.join("wal")).unwrap()
    }

    #[test]
    fn begin_without_commit_is_recoverable() {
        let dir = tempdir().unwrap();
        let log = log_at(dir.path());
        let txn = log
            .begin(MutatingProcedure::Write, b"args".to_vec())
            .unwrap();
        let uncommitted = log.recover().unwrap();
        assert_eq!(uncommitted.len(), 1);
        assert_eq!(uncommitted[0].txn_id, txn);
    }

    #[test]
    fn commit_removes_from_recovery_set() {
        let dir = tempdir().unwrap();
        let log = log_at(dir.path());
        let txn = log
            .begin(MutatingProcedure::Write, b"args".to_vec())
            .unwrap();
        log.commit(txn).unwrap();
        assert!(log.recover().unwrap().is_empty());
    }

    #[test]
    fn pre_state_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wal");
        let txn;
        {
            let log = TransactionLog::open(&path).unwrap();
            txn = log
                .begin(MutatingProcedure::Write, b"args".to_vec())
                .unwrap();
            log.save_pre_state(txn, b"pre".to_vec()).unwrap();
        }
        let reopened = TransactionLog::open(&path).unwrap();
        let uncommitted = reopened.recover().unwrap();
        assert_eq!(uncommitted.len(), 1);
        assert_eq!(uncommitted[0].pre_state.as_deref(), Some(&b"pre"[..]));
    }

    #[test]
    fn rollback_drops_entry_without_writing() {
        let dir = tempdir().unwrap();
        let log = log_at(dir.path());
        let txn = log
            .begin(MutatingProcedure::Write, b"args".to_vec())
            .unwrap();
        log.rollback(txn).unwrap();
        assert!(log.recover().unwrap().is_empty());
    }

    #[test]
    fn compact_truncates_resolved_transactions() {
        let dir = tempdir().unwrap();
        let log = log_at(dir.path());
        let txn = log
            .begin(MutatingProcedure::Write, b"args".to_vec())
            .unwrap();
        log.compact(&[]).unwrap();
        assert!(log.recover().unwrap().is_empty());
        let _ = txn;
    }

    #[test]
    fn txn_ids_are_monotonic_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wal");
        let first;
        {
            let log = TransactionLog::open(&path).unwrap();
            first = log
                .begin(MutatingProcedure::Create, Vec::new())
                .unwrap();
            log.commit(first).unwrap();
        }
        let reopened = TransactionLog::open(&path).unwrap();
        let second = reopened
            .begin(MutatingProcedure::Create, Vec::new())
            .unwrap();
        assert!(second > first);
    }
}
