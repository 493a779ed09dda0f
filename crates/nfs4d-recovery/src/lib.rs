//! Crash recovery, grace-period client reclaim, and session reconnect
//! replay (§4.11): the three disjoint recovery modes layered on the WAL
//! and operation journal.
//!
//! [`crash::CrashRecovery`] runs once at startup, before any traffic is
//! admitted, scanning both logs and redoing or undoing whatever a crash
//! left incomplete. [`grace::GracePeriod`] then gates non-reclaim
//! traffic for the clients that pass turned up with outstanding work,
//! until each sends `RECLAIM_COMPLETE` or the grace deadline elapses.
//! [`replay::ReconnectReplay`] is unrelated to either: it runs per
//! client, any time that client reconnects with pending journal entries
//! of its own, independent of whether the server itself ever crashed.

pub mod consistency;
pub mod crash;
pub mod error;
pub mod grace;
pub mod metrics;
pub mod replay;

pub use consistency::{ConsistencyManager, ConsistencyPoint};
pub use crash::{CrashRecovery, CrashRecoveryReport};
pub use error::{RecoveryError, RecoveryResult};
pub use grace::GracePeriod;
pub use metrics::{RecoveryMetrics, RecoveryMetricsSnapshot};
pub use replay::{ReconnectReplay, ReplaySummary};
