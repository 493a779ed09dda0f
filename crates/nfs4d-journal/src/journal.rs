use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use nfs4d_types::Timestamp;
use nfs4d_wal::TransactionLog;

use crate::entry::{JournalEntry, JournalOutcome};
use crate::error::{JournalError, JournalResult};
use crate::op::MutatingOp;
use crate::record::JournalRecord;
use crate::traits::OperationJournal;
use crate::validation::order_for_replay;

const HEADER_SIZE: usize = 8;

/// The file-backed operation journal, layered on a [`TransactionLog`] for
/// durability.
pub struct Journal {
    wal: Arc<TransactionLog>,
    path: PathBuf,
    writer: Mutex<File>,
    next_seq: AtomicU64,
    index: Mutex<HashMap<u64, JournalEntry>>,
}

impl Journal {
    pub fn open(path: &Path, wal: Arc<TransactionLog>) -> JournalResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let records = Self::read_all_records(path)?;
        let mut index: HashMap<u64, JournalEntry> = HashMap::new();
        let mut max_seq = 0u64;
        for record in records {
            max_seq = max_seq.max(record.seq_id());
            match record {
                JournalRecord::Append {
                    seq_id,
                    txn_id,
                    procedure,
                    args,
                    target_path,
                    timestamp,
                    client_id,
                } => {
                    index.insert(
                        seq_id,
                        JournalEntry {
                            seq_id,
                            txn_id,
                            procedure,
                            args,
                            deps: Vec::new(),
                            target_path,
                            timestamp,
                            completed: false,
                            result: None,
                            client_id,
                        },
                    );
                }
                JournalRecord::Dependency { seq_id, depends_on } => {
                    if let Some(entry) = index.get_mut(&seq_id) {
                        entry.deps.push(depends_on);
                    }
                }
                JournalRecord::Complete { seq_id, result } => {
                    if let Some(entry) = index.get_mut(&seq_id) {
                        entry.completed = true;
                        entry.result = Some(result);
                    }
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
            entries = index.len(),
            "opened operation journal"
        );

        Ok(Self {
            wal,
            path: path.to_path_buf(),
            writer: Mutex::new(file),
            next_seq: AtomicU64::new(max_seq + 1),
            index: Mutex::new(index),
        })
    }

    fn write_record(file: &mut File, record: &JournalRecord) -> JournalResult<()> {
        let payload =
            bincode::serialize(record).map_err(|e| JournalError::Serialization(e.to_string()))?;
        let length = payload.len() as u32;
        let crc = crc32fast::hash(&payload);
        file.write_all(&length.to_le_bytes())?;
        file.write_all(&crc.to_le_bytes())?;
        file.write_all(&payload)?;
        file.flush()?;
        Ok(())
    }

    fn append_record(&self, record: &JournalRecord) -> JournalResult<()> {
        let mut writer = self.writer.lock().expect("journal writer poisoned");
        Self::write_record(&mut writer, record)
    }

    fn read_all_records(path: &Path) -> JournalResult<Vec<JournalRecord>> {
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
                warn!(offset, length, "truncated journal record; stopping scan");
                break;
            }
            let mut payload = vec![0u8; length as usize];
            match reader.read_exact(&mut payload) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }
            if crc32fast::hash(&payload) != expected_crc {
                warn!(offset, "CRC mismatch on journal record; stopping scan");
                break;
            }
            match bincode::deserialize::<JournalRecord>(&payload) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(offset, error = %e, "failed to decode journal record; stopping scan");
                    break;
                }
            }
            offset += HEADER_SIZE as u64 + length as u64;
        }
        Ok(records)
    }
}

impl OperationJournal for Journal {
    fn append(&self, op: &MutatingOp, client_id: Option<String>) -> JournalResult<u64> {
        let args = op.encode();
        let txn_id = self.wal.begin(op.procedure(), args.clone())?;
        let seq_id = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let timestamp = Timestamp::now();
        let target_path = op.target_path().to_string();

        self.append_record(&JournalRecord::Append {
            seq_id,
            txn_id,
            procedure: op.procedure(),
            args: args.clone(),
            target_path: target_path.clone(),
            timestamp,
            client_id: client_id.clone(),
        })?;

        self.index.lock().expect("journal index poisoned").insert(
            seq_id,
            JournalEntry {
                seq_id,
                txn_id,
                procedure: op.procedure(),
                args,
                deps: Vec::new(),
                target_path,
                timestamp,
                completed: false,
                result: None,
                client_id,
            },
        );
        Ok(seq_id)
    }

    fn add_dependency(&self, seq: u64, depends_on_seq: u64) -> JournalResult<()> {
        {
            let mut index = self.index.lock().expect("journal index poisoned");
            let entry = index.get_mut(&seq).ok_or(JournalError::UnknownSeq(seq))?;
            entry.deps.push(depends_on_seq);
        }
        self.append_record(&JournalRecord::Dependency {
            seq_id: seq,
            depends_on: depends_on_seq,
        })
    }

    fn check_dependencies(&self, seq: u64) -> JournalResult<bool> {
        let index = self.index.lock().expect("journal index poisoned");
        let entry = index.get(&seq).ok_or(JournalError::UnknownSeq(seq))?;
        Ok(entry.deps.iter().all(|dep| match index.get(dep) {
            Some(dep_entry) => {
                dep_entry.completed && dep_entry.result == Some(JournalOutcome::Success)
            }
            // Dependency already compacted away: treat as resolved.
            None => true,
        }))
    }

    fn begin_state_transition(&self, seq: u64, pre_state: Vec<u8>) -> JournalResult<()> {
        let txn_id = {
            let index = self.index.lock().expect("journal index poisoned");
            index.get(&seq).ok_or(JournalError::UnknownSeq(seq))?.txn_id
        };
        self.wal.save_pre_state(txn_id, pre_state)?;
        Ok(())
    }

    fn commit_state_transition(&self, seq: u64) -> JournalResult<()> {
        let txn_id = {
            let index = self.index.lock().expect("journal index poisoned");
            index.get(&seq).ok_or(JournalError::UnknownSeq(seq))?.txn_id
        };
        self.wal.commit(txn_id)?;
        Ok(())
    }

    fn rollback_state_transition(&self, seq: u64) -> JournalResult<()> {
        let txn_id = {
            let index = self.index.lock().expect("journal index poisoned");
            index.get(&seq).ok_or(JournalError::UnknownSeq(seq))?.txn_id
        };
        self.wal.rollback(txn_id)?;
        Ok(())
    }

    fn complete(&self, seq: u64, result: JournalOutcome) -> JournalResult<()> {
        let txn_id = {
            let mut index = self.index.lock().expect("journal index poisoned");
            let entry = index.get_mut(&seq).ok_or(JournalError::UnknownSeq(seq))?;
            entry.completed = true;
            entry.result = Some(result.clone());
            entry.txn_id
        };

        // Resolve the WAL txn if an explicit commit/rollback_state_transition
        // call hasn't already done so; `UnknownTxn` just means it has.
        let wal_result = match result {
            JournalOutcome::Success => self.wal.commit(txn_id),
            JournalOutcome::Failed(_) => self.wal.rollback(txn_id),
        };
        match wal_result {
            Ok(()) | Err(nfs4d_wal::WalError::UnknownTxn(_)) => {}
            Err(e) => return Err(e.into()),
        }

        self.append_record(&JournalRecord::Complete { seq_id: seq, result })
    }

    fn recover(&self) -> JournalResult<Vec<JournalEntry>> {
        order_for_replay(self.get_incomplete()?)
    }

    fn get_incomplete(&self) -> JournalResult<Vec<JournalEntry>> {
        let index = self.index.lock().expect("journal index poisoned");
        Ok(index.values().filter(|e| !e.completed).cloned().collect())
    }

    fn compact(&self, keep: &[u64]) -> JournalResult<()> {
        let keep: std::collections::HashSet<u64> = keep.iter().copied().collect();
        let mut writer = self.writer.lock().expect("journal writer poisoned");
        let mut index = self.index.lock().expect("journal index poisoned");
        index.retain(|seq, _| keep.contains(seq));

        let tmp_path = self.path.with_extension("compact.tmp");
        {
            let mut tmp = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)?;
            let mut entries: Vec<&JournalEntry> = index.values().collect();
            entries.sort_by_key(|e| e.seq_id);
            for entry in entries {
                Self::write_record(
                    &mut tmp,
                    &JournalRecord::Append {
                        seq_id: entry.seq_id,
                        txn_id: entry.txn_id,
                        procedure: entry.procedure,
                        args: entry.args.clone(),
                        target_path: entry.target_path.clone(),
                        timestamp: entry.timestamp,
                        client_id: entry.client_id.clone(),
                    },
                )?;
                for &dep in &entry.deps {
                    Self::write_record(
                        &mut tmp,
                        &JournalRecord::Dependency {
                            seq_id: entry.seq_id,
                            depends_on: dep,
                        },
                    )?;
                }
            }
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        *writer = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;
        debug!(remaining = index.len(), "compacted operation journal");
        Ok(())
    }
}
