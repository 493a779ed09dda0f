use crate::error::RpcResult;
use crate::xdr::{Decoder, Encoder};

/// The credential/verifier flavor tag carried in `cred`/`verf`. `Sys`
/// and `Gss` are the two the auth gate understands; anything else is
/// accepted on the wire and rejected by the gate.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CredFlavor {
    None,
    Sys,
    Gss,
    Unknown(u32),
}

impl CredFlavor {
    fn to_wire(self) -> u32 {
        match self {
            CredFlavor::None => 0,
            CredFlavor::Sys => 1,
            CredFlavor::Gss => 6,
            CredFlavor::Unknown(v) => v,
        }
    }

    fn from_wire(v: u32) -> Self {
        match v {
            0 => CredFlavor::None,
            1 => CredFlavor::Sys,
            6 => CredFlavor::Gss,
            other => CredFlavor::Unknown(other),
        }
    }
}

/// An opaque `{flavor, body}` pair, used for both `cred` and `verf`.
#[derive(Clone, Debug)]
pub struct OpaqueAuth {
    pub flavor: CredFlavor,
    pub body: Vec<u8>,
}

impl OpaqueAuth {
    pub fn none() -> Self {
        Self {
            flavor: CredFlavor::None,
            body: Vec::new(),
        }
    }

    pub fn encode(&self, enc: &mut Encoder) {
        enc.put_u32(self.flavor.to_wire());
        enc.put_opaque(&self.body);
    }

    pub fn decode(dec: &mut Decoder<'_>) -> RpcResult<Self> {
        let flavor = CredFlavor::from_wire(dec.get_u32()?);
        let body = dec.get_opaque()?;
        Ok(Self { flavor, body })
    }
}

/// The shared call header (§4.9): `xid`, message type, and (for calls)
/// program/version/procedure plus credential and verifier.
#[derive(Clone, Debug)]
pub struct CallHeader {
    pub xid: u32,
    pub rpc_vers: u32,
    pub program: u32,
    pub version: u32,
    pub procedure: u32,
    pub cred: OpaqueAuth,
    pub verf: OpaqueAuth,
}

impl CallHeader {
    /// `msg_type` is `0` for a call, matching the wire layout in §4.9.
    pub fn decode(dec: &mut Decoder<'_>) -> RpcResult<(u32, Self)> {
        let xid = dec.get_u32()?;
        let msg_type = dec.get_u32()?;
        let rpc_vers = dec.get_u32()?;
        let program = dec.get_u32()?;
        let version = dec.get_u32()?;
        let procedure = dec.get_u32()?;
        let cred = OpaqueAuth::decode(dec)?;
        let verf = OpaqueAuth::decode(dec)?;
        Ok((
            msg_type,
            Self {
                xid,
                rpc_vers,
                program,
                version,
                procedure,
                cred,
                verf,
            },
        ))
    }
}

/// The outcome an accepted call produced, mapped per §4.9's error table.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AcceptStat {
    Success,
    ProgUnavail,
    ProcUnavail,
    GarbageArgs,
    SystemErr,
}

impl AcceptStat {
    fn to_wire(self) -> u32 {
        match self {
            AcceptStat::Success => 0,
            AcceptStat::ProgUnavail => 1,
            AcceptStat::ProcUnavail => 3,
            AcceptStat::GarbageArgs => 4,
            AcceptStat::SystemErr => 5,
        }
    }
}

/// The reply status: either an accepted call (with its [`AcceptStat`])
/// or a denial on authentication grounds.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ReplyStatus {
    Accepted(AcceptStat),
    AuthError,
}

/// The reply header, with the reply body appended by the caller.
pub struct ReplyHeader {
    pub xid: u32,
    pub status: ReplyStatus,
}

impl ReplyHeader {
    pub fn encode(&self, enc: &mut Encoder) {
        enc.put_u32(self.xid);
        enc.put_u32(1); // msg_type = reply
        match self.status {
            ReplyStatus::Accepted(stat) => {
                enc.put_u32(0); // reply_status = MSG_ACCEPTED
                enc.put_u32(stat.to_wire());
            }
            ReplyStatus::AuthError => {
                enc.put_u32(1); // reply_status = MSG_DENIED
                enc.put_u32(1); // auth_status = AUTH_ERROR
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_header_roundtrips() {
        let mut enc = Encoder::new();
        enc.put_u32(42); // xid
        enc.put_u32(0); // msg_type = call
        enc.put_u32(2); // rpc_vers
        enc.put_u32(100_003); // program
        enc.put_u32(4); // version
        enc.put_u32(1); // procedure
        OpaqueAuth::none().encode(&mut enc);
        OpaqueAuth::none().encode(&mut enc);
        let bytes = enc.into_bytes();
        let mut dec = Decoder::new(&bytes);
        let (msg_type, header) = CallHeader::decode(&mut dec).unwrap();
        assert_eq!(msg_type, 0);
        assert_eq!(header.xid, 42);
        assert_eq!(header.program, 100_003);
        assert_eq!(header.procedure, 1);
    }

    #[test]
    fn reply_header_encodes_accepted() {
        let mut enc = Encoder::new();
        ReplyHeader {
            xid: 7,
            status: ReplyStatus::Accepted(AcceptStat::Success),
        }
        .encode(&mut enc);
        let bytes = enc.into_bytes();
        let mut dec = Decoder::new(&bytes);
        assert_eq!(dec.get_u32().unwrap(), 7);
        assert_eq!(dec.get_u32().unwrap(), 1);
        assert_eq!(dec.get_u32().unwrap(), 0);
        assert_eq!(dec.get_u32().unwrap(), 0);
    }
}
