//! The handle table: an injective map between opaque 16-byte
//! [`nfs4d_types::FileHandle`]s and absolute filesystem paths.
//!
//! A handle is created on first reference to a path and destroyed on
//! [`HandleTable::forget`] (invoked by REMOVE/RMDIR); it persists across
//! client reconnects but not across server restarts unless rebuilt during
//! recovery. All operations serialize on one mutex, per the lock-ordering
//! invariant (handle-table mutex < per-file lock < WAL mutex).

pub mod error;
pub mod memory;
pub mod names;
pub mod traits;

pub use error::{HandleError, HandleResult};
pub use memory::InMemoryHandleTable;
pub use names::{validate_component, MAX_NAME_LEN};
pub use traits::HandleTable;
