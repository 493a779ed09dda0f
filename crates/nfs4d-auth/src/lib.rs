//! SYS and GSS credential verification and the access-authorization
//! predicate (§4.8).
//!
//! [`AuthGate::verify`] is the single entry point the RPC frontend calls
//! before a request reaches the compound engine: it accepts `AUTH_SYS`
//! outright and drives the `AUTH_GSS` context-establishment handshake and
//! per-call MIC check for everything else. A GSS context's key never
//! leaves [`gss::GssRegistry`]; the rest of the server only ever sees a
//! [`model::Credentials`] holder id.

pub mod error;
pub mod gate;
pub mod gss;
pub mod model;

pub use error::{AuthError, AuthResult};
pub use gate::{AuthGate, VerifyOutcome};
pub use gss::GssRegistry;
pub use model::{Credentials, GssCredential, SysCredential};
