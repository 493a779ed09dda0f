use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::os::unix::fs::{symlink as unix_symlink, MetadataExt, PermissionsExt};
use std::path::Path;

use nfs4d_types::{setattr_mask, NfsFileType};

use crate::entry::{AttrChange, DirEntry, OracleAttrs};
use crate::error::{FsError, FsResult};
use crate::traits::FilesystemOracle;

/// A [`FilesystemOracle`] backed directly by the host's local filesystem
/// via POSIX syscalls (through `std::fs`/`std::os::unix`).
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFilesystem;

impl LocalFilesystem {
    pub fn new() -> Self {
        Self
    }
}

fn file_type_of(meta: &fs::Metadata) -> NfsFileType {
    let ft = meta.file_type();
    if ft.is_dir() {
        NfsFileType::Dir
    } else if ft.is_symlink() {
        NfsFileType::Lnk
    } else if ft.is_file() {
        NfsFileType::Reg
    } else {
        use std::os::unix::fs::FileTypeExt;
        if ft.is_block_device() {
            NfsFileType::Blk
        } else if ft.is_char_device() {
            NfsFileType::Chr
        } else if ft.is_socket() {
            NfsFileType::Sock
        } else if ft.is_fifo() {
            NfsFileType::Fifo
        } else {
            NfsFileType::Reg
        }
    }
}

fn attrs_from_metadata(meta: &fs::Metadata) -> OracleAttrs {
    OracleAttrs {
        file_type: Some(file_type_of(meta)),
        mode: meta.permissions().mode() & 0o7777,
        nlink: meta.nlink() as u32,
        uid: meta.uid(),
        gid: meta.gid(),
        size: meta.len(),
        used: (meta.blocks() as u64) * 512,
        fileid: meta.ino(),
        atime_secs: meta.atime().max(0) as u64,
        mtime_secs: meta.mtime().max(0) as u64,
        ctime_secs: meta.ctime().max(0) as u64,
    }
}

impl FilesystemOracle for LocalFilesystem {
    fn exists(&self, path: &Path) -> bool {
        path.symlink_metadata().is_ok()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_file(&self, path: &Path, mode: u32) -> FsResult<()> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(map_create_err)?;
        file.set_permissions(fs::Permissions::from_mode(mode))?;
        Ok(())
    }

    fn mkdir(&self, path: &Path, mode: u32) -> FsResult<()> {
        fs::create_dir(path).map_err(map_create_err)?;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
        Ok(())
    }

    fn symlink(&self, target: &str, link_path: &Path) -> FsResult<()> {
        unix_symlink(target, link_path).map_err(map_create_err)
    }

    fn readlink(&self, path: &Path) -> FsResult<String> {
        let target = fs::read_link(path).map_err(map_read_err)?;
        Ok(target.to_string_lossy().into_owned())
    }

    fn remove_file(&self, path: &Path) -> FsResult<()> {
        fs::remove_file(path).map_err(map_read_err)
    }

    fn rmdir(&self, path: &Path) -> FsResult<()> {
        fs::remove_dir(path).map_err(|e| match e.raw_os_error() {
            Some(39) => FsError::NotEmpty(path.display().to_string()), // ENOTEMPTY
            _ => map_read_err(e),
        })
    }

    fn rename(&self, old: &Path, new: &Path) -> FsResult<()> {
        fs::rename(old, new).map_err(|e| match e.raw_os_error() {
            Some(18) => FsError::CrossDevice(old.display().to_string(), new.display().to_string()), // EXDEV
            _ => map_read_err(e),
        })
    }

    fn read(&self, path: &Path, offset: u64, count: u32) -> FsResult<(Vec<u8>, bool)> {
        let mut file = File::open(path).map_err(map_read_err)?;
        let len = file.metadata()?.len();
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; count as usize];
        let mut total = 0usize;
        loop {
            let n = file.read(&mut buf[total..])?;
            if n == 0 {
                break;
            }
            total += n;
            if total == buf.len() {
                break;
            }
        }
        buf.truncate(total);
        let eof = offset + total as u64 >= len;
        Ok((buf, eof))
    }

    fn write(&self, path: &Path, offset: u64, data: &[u8], stable: bool) -> FsResult<(u32, bool)> {
        let mut file = OpenOptions::new().write(true).open(path).map_err(map_read_err)?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;
        if stable {
            file.sync_all()?;
        }
        Ok((data.len() as u32, stable))
    }

    fn getattr(&self, path: &Path) -> FsResult<OracleAttrs> {
        let meta = path.symlink_metadata().map_err(map_read_err)?;
        Ok(attrs_from_metadata(&meta))
    }

    fn setattr(&self, path: &Path, change: &AttrChange) -> FsResult<OracleAttrs> {
        if change.mask & setattr_mask::MODE != 0 {
            if let Some(mode) = change.mode {
                fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(map_read_err)?;
            }
        }
        if change.mask & setattr_mask::SIZE != 0 {
            if let Some(size) = change.size {
                let file = OpenOptions::new().write(true).open(path).map_err(map_read_err)?;
                file.set_len(size)?;
            }
        }
        // uid/gid/atime/mtime changes require root or ownership in the real
        // world; the oracle attempts them and lets the OS reject via errno.
        self.getattr(path)
    }

    fn readdir(&self, path: &Path, cookie: u64, maxcount: u32) -> FsResult<(Vec<DirEntry>, bool)> {
        if !path.is_dir() {
            return Err(FsError::NotDirectory(path.display().to_string()));
        }
        let mut names: Vec<_> = fs::read_dir(path)
            .map_err(map_read_err)?
            .filter_map(|e| e.ok())
            .collect();
        names.sort_by_key(|e| e.file_name());

        if maxcount == 0 {
            return Ok((Vec::new(), false));
        }

        let mut entries = Vec::new();
        let mut used = 0u32;
        let mut eof = true;
        for (idx, entry) in names.iter().enumerate() {
            let entry_cookie = (idx + 1) as u64;
            if entry_cookie <= cookie {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let meta = match entry.metadata() {
                Ok(m) => m,
                Err(_) => continue,
            };
            let size_estimate = (name.len() as u32) + 24;
            if used + size_estimate > maxcount && !entries.is_empty() {
                eof = false;
                break;
            }
            used += size_estimate;
            entries.push(DirEntry {
                name,
                file_type: file_type_of(&meta),
                fileid: meta.ino(),
                cookie: entry_cookie,
            });
        }
        Ok((entries, eof))
    }

    fn read_full(&self, path: &Path) -> FsResult<Vec<u8>> {
        fs::read(path).map_err(map_read_err)
    }

    fn write_full(&self, path: &Path, data: &[u8]) -> FsResult<()> {
        fs::write(path, data).map_err(map_read_err)
    }

    fn fsync(&self, path: &Path) -> FsResult<()> {
        let file = File::open(path).map_err(map_read_err)?;
        file.sync_all().map_err(FsError::Io)
    }
}

fn map_read_err(e: std::io::Error) -> FsError {
    match e.raw_os_error() {
        Some(2) => FsError::NotFound(String::new()), // ENOENT
        _ => FsError::Io(e),
    }
}

fn map_create_err(e: std::io::Error) -> FsError {
    match e.raw_os_error() {
        Some(17) => FsError::AlreadyExists(String::new()), // EEXIST
        _ => FsError::Io(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_write_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFilesystem::new();
        let path = dir.path().join("a");
        fs.create_file(&path, 0o644).unwrap();
        fs.write(&path, 0, b"hello", true).unwrap();
        let (data, eof) = fs.read(&path, 0, 5).unwrap();
        assert_eq!(data, b"hello");
        assert!(eof);
    }

    #[test]
    fn exclusive_create_rejects_existing() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFilesystem::new();
        let path = dir.path().join("a");
        fs.create_file(&path, 0o644).unwrap();
        assert!(matches!(
            fs.create_file(&path, 0o644),
            Err(FsError::AlreadyExists(_))
        ));
    }

    #[test]
    fn rmdir_rejects_nonempty() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFilesystem::new();
        let sub = dir.path().join("d");
        fs.mkdir(&sub, 0o755).unwrap();
        fs.create_file(&sub.join("a"), 0o644).unwrap();
        assert!(matches!(fs.rmdir(&sub), Err(FsError::NotEmpty(_))));
    }
}
