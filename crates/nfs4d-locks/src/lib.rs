//! Per-file byte-range advisory lock manager (§4.5).
//!
//! Locks are scoped to a [`nfs4d_types::FileHandle`] and a byte range.
//! Overlapping write locks, or a read and a write, from different
//! holders conflict; same-holder same-range requests of a different
//! kind upgrade or downgrade in place. Waiters block on a per-file
//! condition variable, guarded by ephemeral wait-for-graph deadlock
//! detection and a bounded timeout.

pub mod error;
pub mod graph;
pub mod manager;
pub mod region;
pub mod stats;

pub use error::{LockError, LockResult};
pub use graph::{would_deadlock, Waiter};
pub use manager::{LockManager, LockOutcome, UnlockOutcome};
pub use region::{coalesce, split, LockRegion};
pub use stats::{LockStats, LockStatsSnapshot};
