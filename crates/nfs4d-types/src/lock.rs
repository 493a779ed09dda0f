use serde::{Deserialize, Serialize};

/// The two advisory lock flavors the lock manager grants.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub enum LockKind {
    Read,
    Write,
}

impl LockKind {
    /// Whether two locks of these kinds, held by different holders, can
    /// ever coexist over the same byte range.
    pub fn conflicts_with(&self, other: LockKind) -> bool {
        matches!(
            (self, other),
            (LockKind::Write, LockKind::Write)
                | (LockKind::Write, LockKind::Read)
                | (LockKind::Read, LockKind::Write)
        )
    }
}
