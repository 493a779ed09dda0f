//! Cryptographic primitives for `nfs4d`.
//!
//! Two narrow responsibilities, both called out by the handle-table and
//! auth-gate specifications:
//!
//! - [`handle_id`] — a collision-checked, CSPRNG-derived 128-bit identifier
//!   for new file handles, replacing the non-cryptographic hash-truncation
//!   scheme the original source used.
//! - [`mic`] — a keyed BLAKE3 hash used as the GSS per-call Message
//!   Integrity Code. This is not a GSS implementation; it is the primitive
//!   the auth gate calls once a GSS context key has been established.

pub mod error;
pub mod handle_id;
pub mod mic;

pub use error::CryptoError;
pub use handle_id::HandleIdGenerator;
pub use mic::{Mic, MicKey};
