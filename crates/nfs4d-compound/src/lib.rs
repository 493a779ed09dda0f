//! The compound dispatch engine: walks an ordered list of NFSv4
//! operations against a shared current/saved filehandle context,
//! stopping at the first non-`Ok` status (§4.10).
//!
//! Operations arrive already decoded as [`CompoundOp`] -- the RPC
//! frontend owns turning wire bytes into these and this crate's replies
//! back into bytes; [`CompoundEngine`] only ever sees typed values and
//! never touches XDR.

pub mod context;
pub mod engine;
pub mod error;
pub mod ops;

pub use context::{CompoundContext, ConnectionGuard};
pub use engine::{fs_error_to_status, CompoundEngine, ReclaimSink};
pub use error::{CompoundError, CompoundResult};
pub use ops::{CompoundOp, CompoundReply, ExecutedOp, OpResult};
