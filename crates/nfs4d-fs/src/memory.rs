use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};

use nfs4d_types::NfsFileType;

use crate::entry::{AttrChange, DirEntry, OracleAttrs};
use crate::error::{FsError, FsResult};
use crate::traits::FilesystemOracle;

#[derive(Clone, Debug)]
enum Node {
    File { data: Vec<u8>, mode: u32, mtime: u64, ctime: u64 },
    Dir { mode: u32, mtime: u64, ctime: u64 },
    Symlink { target: String, mtime: u64, ctime: u64 },
}

/// An in-memory [`FilesystemOracle`], keyed by normalized path. Intended
/// for tests: it has no durability of its own (that is the WAL/journal's
/// job) and no cross-device concept, so `rename` never reports
/// `CrossDevice`.
pub struct InMemoryFilesystem {
    nodes: RwLock<BTreeMap<PathBuf, Node>>,
    next_fileid: AtomicU64,
    fileids: RwLock<BTreeMap<PathBuf, u64>>,
}

impl InMemoryFilesystem {
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            PathBuf::from("/"),
            Node::Dir {
                mode: 0o755,
                mtime: now(),
                ctime: now(),
            },
        );
        let mut fileids = BTreeMap::new();
        fileids.insert(PathBuf::from("/"), 1);
        Self {
            nodes: RwLock::new(nodes),
            next_fileid: AtomicU64::new(2),
            fileids: RwLock::new(fileids),
        }
    }

    fn fileid_for(&self, path: &Path) -> u64 {
        let mut map = self.fileids.write().expect("lock poisoned");
        *map.entry(path.to_path_buf())
            .or_insert_with(|| self.next_fileid.fetch_add(1, Ordering::SeqCst))
    }

    fn children_of<'a>(
        nodes: &'a BTreeMap<PathBuf, Node>,
        dir: &Path,
    ) -> Vec<(&'a PathBuf, &'a Node)> {
        nodes
            .iter()
            .filter(|(p, _)| p.parent() == Some(dir) && p.as_path() != dir)
            .collect()
    }
}

impl Default for InMemoryFilesystem {
    fn default() -> Self {
        Self::new()
    }
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

impl FilesystemOracle for InMemoryFilesystem {
    fn exists(&self, path: &Path) -> bool {
        self.nodes.read().expect("lock poisoned").contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(
            self.nodes.read().expect("lock poisoned").get(path),
            Some(Node::Dir { .. })
        )
    }

    fn create_file(&self, path: &Path, mode: u32) -> FsResult<()> {
        let mut nodes = self.nodes.write().expect("lock poisoned");
        if nodes.contains_key(path) {
            return Err(FsError::AlreadyExists(path.display().to_string()));
        }
        nodes.insert(
            path.to_path_buf(),
            Node::File {
                data: Vec::new(),
                mode,
                mtime: now(),
                ctime: now(),
            },
        );
        Ok(())
    }

    fn mkdir(&self, path: &Path, mode: u32) -> FsResult<()> {
        let mut nodes = self.nodes.write().expect("lock poisoned");
        if nodes.contains_key(path) {
            return Err(FsError::AlreadyExists(path.display().to_string()));
        }
        nodes.insert(
            path.to_path_buf(),
            Node::Dir {
                mode,
                mtime: now(),
                ctime: now(),
            },
        );
        Ok(())
    }

    fn symlink(&self, target: &str, link_path: &Path) -> FsResult<()> {
        let mut nodes = self.nodes.write().expect("lock poisoned");
        if nodes.contains_key(link_path) {
            return Err(FsError::AlreadyExists(link_path.display().to_string()));
        }
        nodes.insert(
            link_path.to_path_buf(),
            Node::Symlink {
                target: target.to_string(),
                mtime: now(),
                ctime: now(),
            },
        );
        Ok(())
    }

    fn readlink(&self, path: &Path) -> FsResult<String> {
        match self.nodes.read().expect("lock poisoned").get(path) {
            Some(Node::Symlink { target, .. }) => Ok(target.clone()),
            Some(_) => Err(FsError::NotDirectory(path.display().to_string())),
            None => Err(FsError::NotFound(path.display().to_string())),
        }
    }

    fn remove_file(&self, path: &Path) -> FsResult<()> {
        let mut nodes = self.nodes.write().expect("lock poisoned");
        match nodes.get(path) {
            Some(Node::Dir { .. }) => return Err(FsError::IsDirectory(path.display().to_string())),
            Some(_) => {}
            None => return Err(FsError::NotFound(path.display().to_string())),
        }
        nodes.remove(path);
        Ok(())
    }

    fn rmdir(&self, path: &Path) -> FsResult<()> {
        let mut nodes = self.nodes.write().expect("lock poisoned");
        match nodes.get(path) {
            Some(Node::Dir { .. }) => {}
            Some(_) => return Err(FsError::NotDirectory(path.display().to_string())),
            None => return Err(FsError::NotFound(path.display().to_string())),
        }
        if Self::children_of(&nodes, path).into_iter().next().is_some() {
            return Err(FsError::NotEmpty(path.display().to_string()));
        }
        nodes.remove(path);
        Ok(())
    }

    fn rename(&self, old: &Path, new: &Path) -> FsResult<()> {
        let mut nodes = self.nodes.write().expect("lock poisoned");
        let node = nodes
            .remove(old)
            .ok_or_else(|| FsError::NotFound(old.display().to_string()))?;
        nodes.insert(new.to_path_buf(), node);
        Ok(())
    }

    fn read(&self, path: &Path, offset: u64, count: u32) -> FsResult<(Vec<u8>, bool)> {
        let nodes = self.nodes.read().expect("lock poisoned");
        match nodes.get(path) {
            Some(Node::File { data, .. }) => {
                let start = (offset as usize).min(data.len());
                let end = start.saturating_add(count as usize).min(data.len());
                let chunk = data[start..end].to_vec();
                let eof = end >= data.len();
                Ok((chunk, eof))
            }
            Some(Node::Dir { .. }) => Err(FsError::IsDirectory(path.display().to_string())),
            Some(Node::Symlink { .. }) => Err(FsError::NotDirectory(path.display().to_string())),
            None => Err(FsError::NotFound(path.display().to_string())),
        }
    }

    fn write(&self, path: &Path, offset: u64, data: &[u8], stable: bool) -> FsResult<(u32, bool)> {
        let mut nodes = self.nodes.write().expect("lock poisoned");
        match nodes.get_mut(path) {
            Some(Node::File { data: existing, mtime, .. }) => {
                let start = offset as usize;
                if existing.len() < start {
                    existing.resize(start, 0);
                }
                let end = start + data.len();
                if existing.len() < end {
                    existing.resize(end, 0);
                }
                existing[start..end].copy_from_slice(data);
                *mtime = now();
                Ok((data.len() as u32, stable))
            }
            Some(_) => Err(FsError::IsDirectory(path.display().to_string())),
            None => Err(FsError::NotFound(path.display().to_string())),
        }
    }

    fn getattr(&self, path: &Path) -> FsResult<OracleAttrs> {
        let nodes = self.nodes.read().expect("lock poisoned");
        let node = nodes
            .get(path)
            .ok_or_else(|| FsError::NotFound(path.display().to_string()))?;
        let fileid = self.fileid_for(path);
        Ok(match node {
            Node::File { data, mode, mtime, ctime } => OracleAttrs {
                file_type: Some(NfsFileType::Reg),
                mode: *mode,
                nlink: 1,
                uid: 0,
                gid: 0,
                size: data.len() as u64,
                used: data.len() as u64,
                fileid,
                atime_secs: *mtime,
                mtime_secs: *mtime,
                ctime_secs: *ctime,
            },
            Node::Dir { mode, mtime, ctime } => OracleAttrs {
                file_type: Some(NfsFileType::Dir),
                mode: *mode,
                nlink: 2,
                uid: 0,
                gid: 0,
                size: 4096,
                used: 4096,
                fileid,
                atime_secs: *mtime,
                mtime_secs: *mtime,
                ctime_secs: *ctime,
            },
            Node::Symlink { target, mtime, ctime } => OracleAttrs {
                file_type: Some(NfsFileType::Lnk),
                mode: 0o777,
                nlink: 1,
                uid: 0,
                gid: 0,
                size: target.len() as u64,
                used: target.len() as u64,
                fileid,
                atime_secs: *mtime,
                mtime_secs: *mtime,
                ctime_secs: *ctime,
            },
        })
    }

    fn setattr(&self, path: &Path, change: &AttrChange) -> FsResult<OracleAttrs> {
        use nfs4d_types::setattr_mask;
        let mut nodes = self.nodes.write().expect("lock poisoned");
        match nodes
            .get_mut(path)
            .ok_or_else(|| FsError::NotFound(path.display().to_string()))?
        {
            Node::File { data, mode, mtime, ctime } => {
                if change.mask & setattr_mask::MODE != 0 {
                    if let Some(m) = change.mode {
                        *mode = m;
                    }
                }
                if change.mask & setattr_mask::SIZE != 0 {
                    if let Some(size) = change.size {
                        data.resize(size as usize, 0);
                    }
                }
                if change.mask & setattr_mask::MTIME != 0 {
                    if let Some(m) = change.mtime_secs {
                        *mtime = m;
                    }
                }
                *ctime = now();
            }
            Node::Dir { mode, ctime, .. } => {
                if change.mask & setattr_mask::MODE != 0 {
                    if let Some(m) = change.mode {
                        *mode = m;
                    }
                }
                *ctime = now();
            }
            Node::Symlink { .. } => {}
        }
        drop(nodes);
        self.getattr(path)
    }

    fn readdir(&self, path: &Path, cookie: u64, maxcount: u32) -> FsResult<(Vec<DirEntry>, bool)> {
        let nodes = self.nodes.read().expect("lock poisoned");
        if !matches!(nodes.get(path), Some(Node::Dir { .. })) {
            return Err(FsError::NotDirectory(path.display().to_string()));
        }
        let mut children = Self::children_of(&nodes, path);
        children.sort_by(|a, b| a.0.cmp(b.0));

        if maxcount == 0 {
            return Ok((Vec::new(), false));
        }

        let mut entries = Vec::new();
        let mut used = 0u32;
        let mut eof = true;
        for (idx, (child_path, node)) in children.iter().enumerate() {
            let entry_cookie = (idx + 1) as u64;
            if entry_cookie <= cookie {
                continue;
            }
            let name = child_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let size_estimate = (name.len() as u32) + 24;
            if used + size_estimate > maxcount && !entries.is_empty() {
                eof = false;
                break;
            }
            used += size_estimate;
            entries.push(DirEntry {
                name: name.clone(),
                file_type: match node {
                    Node::File { .. } => NfsFileType::Reg,
                    Node::Dir { .. } => NfsFileType::Dir,
                    Node::Symlink { .. } => NfsFileType::Lnk,
                },
                fileid: self.fileid_for(child_path),
                cookie: entry_cookie,
            });
        }
        Ok((entries, eof))
    }

    fn read_full(&self, path: &Path) -> FsResult<Vec<u8>> {
        match self.nodes.read().expect("lock poisoned").get(path) {
            Some(Node::File { data, .. }) => Ok(data.clone()),
            Some(_) => Err(FsError::IsDirectory(path.display().to_string())),
            None => Err(FsError::NotFound(path.display().to_string())),
        }
    }

    fn write_full(&self, path: &Path, data: &[u8]) -> FsResult<()> {
        let mut nodes = self.nodes.write().expect("lock poisoned");
        match nodes.get_mut(path) {
            Some(Node::File { data: existing, mtime, .. }) => {
                *existing = data.to_vec();
                *mtime = now();
                Ok(())
            }
            Some(_) => Err(FsError::IsDirectory(path.display().to_string())),
            None => {
                nodes.insert(
                    path.to_path_buf(),
                    Node::File {
                        data: data.to_vec(),
                        mode: 0o644,
                        mtime: now(),
                        ctime: now(),
                    },
                );
                Ok(())
            }
        }
    }

    fn fsync(&self, _path: &Path) -> FsResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_write_read_roundtrip() {
        let fs = InMemoryFilesystem::new();
        fs.create_file(Path::new("/a"), 0o644).unwrap();
        let (written, _) = fs.write(Path::new("/a"), 0, b"hello", false).unwrap();
        assert_eq!(written, 5);
        let (data, eof) = fs.read(Path::new("/a"), 0, 5).unwrap();
        assert_eq!(data, b"hello");
        assert!(eof);
        assert_eq!(fs.getattr(Path::new("/a")).unwrap().size, 5);
    }

    #[test]
    fn write_past_eof_extends_file() {
        let fs = InMemoryFilesystem::new();
        fs.create_file(Path::new("/a"), 0o644).unwrap();
        fs.write(Path::new("/a"), 0, b"hello", false).unwrap();
        fs.write(Path::new("/a"), 5, b"world", false).unwrap();
        assert_eq!(fs.getattr(Path::new("/a")).unwrap().size, 10);
    }

    #[test]
    fn exclusive_create_rejects_existing() {
        let fs = InMemoryFilesystem::new();
        fs.create_file(Path::new("/a"), 0o644).unwrap();
        assert!(matches!(
            fs.create_file(Path::new("/a"), 0o644),
            Err(FsError::AlreadyExists(_))
        ));
    }

    #[test]
    fn readdir_maxcount_zero_returns_empty_page_not_eof() {
        let fs = InMemoryFilesystem::new();
        fs.create_file(Path::new("/a"), 0o644).unwrap();
        let (entries, eof) = fs.readdir(Path::new("/"), 0, 0).unwrap();
        assert!(entries.is_empty());
        assert!(!eof);
    }

    #[test]
    fn readdir_cookie_past_end_returns_empty_and_eof() {
        let fs = InMemoryFilesystem::new();
        fs.create_file(Path::new("/a"), 0o644).unwrap();
        let (entries, eof) = fs.readdir(Path::new("/"), 99, 4096).unwrap();
        assert!(entries.is_empty());
        assert!(eof);
    }

    #[test]
    fn rmdir_rejects_nonempty() {
        let fs = InMemoryFilesystem::new();
        fs.mkdir(Path::new("/d"), 0o755).unwrap();
        fs.create_file(Path::new("/d/a"), 0o644).unwrap();
        assert!(matches!(
            fs.rmdir(Path::new("/d")),
            Err(FsError::NotEmpty(_))
        ));
    }

    #[test]
    fn readdir_maxcount_zero_returns_empty_not_eof() {
        let fs = InMemoryFilesystem::new();
        fs.create_file(Path::new("/a"), 0o644).unwrap();
        let (entries, eof) = fs.readdir(Path::new("/"), 0, 0).unwrap();
        assert!(entries.is_empty());
        assert!(!eof);
    }

    #[test]
    fn readdir_cookie_past_end_is_eof() {
        let fs = InMemoryFilesystem::new();
        fs.create_file(Path::new("/a"), 0o644).unwrap();
        let (entries, eof) = fs.readdir(Path::new("/"), 1000, 4096).unwrap();
        assert!(entries.is_empty());
        assert!(eof);
    }
}
