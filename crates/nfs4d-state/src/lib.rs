//! Client registry, lease renewal, and open/lock/delegation state
//! objects (§4.6).
//!
//! A client's states live only as long as its lease: [`StateManager`]
//! refuses to attach new state to an expired or unconfirmed client, and
//! [`StateManager::cleanup_expired`] drops a client and everything it
//! owns the moment its lease lapses.

pub mod error;
pub mod manager;
pub mod model;

pub use error::{StateError, StateResult};
pub use manager::StateManager;
pub use model::{ClientIdentity, Lease, StateKind, StateRecord, StateType};
