//! ONC RPC wire codec, record framing, and program/procedure dispatch
//! (§4.9).
//!
//! This crate has no notion of NFS operations -- it decodes call
//! headers, frames records, and tells the caller which [`NfsProcedure`]
//! a `(program, version, procedure)` triple names. The compound engine
//! interprets the procedure's argument bytes.

pub mod dispatch;
pub mod error;
pub mod framing;
pub mod header;
pub mod xdr;

pub use dispatch::resolve_procedure;
pub use error::{RpcError, RpcResult};
pub use framing::{read_record, write_record, MAX_RECORD_LEN};
pub use header::{AcceptStat, CallHeader, CredFlavor, OpaqueAuth, ReplyHeader, ReplyStatus};
pub use nfs4d_types::NfsProcedure;
pub use xdr::{Decoder, Encoder, MAX_OPAQUE_LEN};
