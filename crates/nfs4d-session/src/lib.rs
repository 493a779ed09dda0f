//! Session creation/confirm/destroy and per-session sequence-id
//! monotonicity (§4.7).
//!
//! A session-bound call must pass [`SessionManager::check_sequence`]
//! before any mutation is attempted; a failing check is a replay
//! attempt and must be rejected with `SeqMisordered`, never silently
//! re-applied.

pub mod error;
pub mod manager;
pub mod model;

pub use error::{SessionError, SessionResult};
pub use manager::SessionManager;
pub use model::Session;
