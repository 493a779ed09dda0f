use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Width of an opaque file handle, in bytes. Fixed by the wire format.
pub const HANDLE_LEN: usize = 16;

/// An opaque, wire-stable identifier standing in for a filesystem path.
///
/// Two handles never share a path and a path has at most one handle (see
/// the handle table's injectivity invariant). The bytes carry no meaning
/// outside the process that issued them.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileHandle([u8; HANDLE_LEN]);

impl FileHandle {
    /// Wrap raw bytes as a handle.
    pub const fn from_bytes(bytes: [u8; HANDLE_LEN]) -> Self {
        Self(bytes)
    }

    /// Borrow the raw bytes, e.g. for wire encoding.
    pub fn as_bytes(&self) -> &[u8; HANDLE_LEN] {
        &self.0
    }

    /// Decode from a slice of exactly `HANDLE_LEN` bytes.
    pub fn from_slice(slice: &[u8]) -> Result<Self, TypeError> {
        if slice.len() != HANDLE_LEN {
            return Err(TypeError::InvalidLength {
                expected: HANDLE_LEN,
                actual: slice.len(),
            });
        }
        let mut bytes = [0u8; HANDLE_LEN];
        bytes.copy_from_slice(slice);
        Ok(Self(bytes))
    }
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileHandle({})", hex::encode(self.0))
    }
}

impl fmt::Display for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_slice() {
        let bytes = [7u8; HANDLE_LEN];
        let h = FileHandle::from_bytes(bytes);
        let h2 = FileHandle::from_slice(h.as_bytes()).unwrap();
        assert_eq!(h, h2);
    }

    #[test]
    fn rejects_wrong_length() {
        let err = FileHandle::from_slice(&[0u8; 8]).unwrap_err();
        assert!(matches!(err, TypeError::InvalidLength { .. }));
    }
}
