use nfs4d_rpc::{Decoder, Encoder, RpcError};

use crate::error::{AuthError, AuthResult};

/// The wire layout's cap on `aux_gids`.
pub const MAX_AUX_GIDS: usize = 16;

/// The decoded `AUTH_SYS` credential body: `{ stamp, machine_name, uid,
/// gid, aux_gids[<=16] }`. No cryptographic check backs this flavor;
/// the caller's claimed identity is trusted as-is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SysCredential {
    pub stamp: u32,
    pub machine_name: String,
    pub uid: u32,
    pub gid: u32,
    pub aux_gids: Vec<u32>,
}

impl SysCredential {
    pub fn decode(body: &[u8]) -> AuthResult<Self> {
        let mut dec = Decoder::new(body);
        let stamp = dec.get_u32().map_err(map_rpc_err)?;
        let machine_name = dec.get_string().map_err(map_rpc_err)?;
        let uid = dec.get_u32().map_err(map_rpc_err)?;
        let gid = dec.get_u32().map_err(map_rpc_err)?;
        let count = dec.get_u32().map_err(map_rpc_err)? as usize;
        if count > MAX_AUX_GIDS {
            return Err(AuthError::BadCredential(format!(
                "aux_gids count {count} exceeds the {MAX_AUX_GIDS} cap"
            )));
        }
        let mut aux_gids = Vec::with_capacity(count);
        for _ in 0..count {
            aux_gids.push(dec.get_u32().map_err(map_rpc_err)?);
        }
        Ok(Self {
            stamp,
            machine_name,
            uid,
            gid,
            aux_gids,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut enc = Encoder::new();
        enc.put_u32(self.stamp);
        enc.put_string(&self.machine_name);
        enc.put_u32(self.uid);
        enc.put_u32(self.gid);
        enc.put_u32(self.aux_gids.len() as u32);
        for gid in &self.aux_gids {
            enc.put_u32(*gid);
        }
        enc.into_bytes()
    }
}

fn map_rpc_err(e: RpcError) -> AuthError {
    AuthError::BadCredential(e.to_string())
}

/// The authenticated identity a call carries once the auth gate has
/// accepted it, regardless of which flavor produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Credentials {
    Sys(SysCredential),
    Gss { context_id: Vec<u8> },
}

impl Credentials {
    /// A stable string the rest of the server can use as a lock/session
    /// holder identity.
    pub fn holder_id(&self) -> String {
        match self {
            Credentials::Sys(cred) => format!("sys:{}:{}", cred.machine_name, cred.uid),
            Credentials::Gss { context_id } => format!("gss:{}", hex::encode(context_id)),
        }
    }
}

/// The decoded `AUTH_GSS` credential body: either an initial security
/// token (context not yet established) or a reference to an
/// established context plus the per-call sequence number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GssCredential {
    Init { token: Vec<u8> },
    Established { context_id: Vec<u8>, seq_num: u32 },
}

impl GssCredential {
    pub fn decode(body: &[u8]) -> AuthResult<Self> {
        let mut dec = Decoder::new(body);
        let tag = dec.get_u32().map_err(map_rpc_err)?;
        match tag {
            0 => Ok(GssCredential::Init {
                token: dec.get_opaque().map_err(map_rpc_err)?,
            }),
            1 => {
                let context_id = dec.get_opaque().map_err(map_rpc_err)?;
                let seq_num = dec.get_u32().map_err(map_rpc_err)?;
                Ok(GssCredential::Established { context_id, seq_num })
            }
            other => Err(AuthError::BadCredential(format!("unknown GSS credential tag {other}"))),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut enc = Encoder::new();
        match self {
            GssCredential::Init { token } => {
                enc.put_u32(0);
                enc.put_opaque(token);
            }
            GssCredential::Established { context_id, seq_num } => {
                enc.put_u32(1);
                enc.put_opaque(context_id);
                enc.put_u32(*seq_num);
            }
        }
        enc.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gss_credential_roundtrips_both_variants() {
        let init = GssCredential::Init { token: vec![1, 2, 3] };
        assert_eq!(GssCredential::decode(&init.encode()).unwrap(), init);

        let established = GssCredential::Established {
            context_id: vec![9, 9],
            seq_num: 4,
        };
        assert_eq!(GssCredential::decode(&established.encode()).unwrap(), established);
    }

    #[test]
    fn sys_credential_roundtrips() {
        let cred = SysCredential {
            stamp: 1,
            machine_name: "client1".into(),
            uid: 1000,
            gid: 1000,
            aux_gids: vec![10, 20],
        };
        let decoded = SysCredential::decode(&cred.encode()).unwrap();
        assert_eq!(decoded, cred);
    }

    #[test]
    fn rejects_too_many_aux_gids() {
        let mut enc = Encoder::new();
        enc.put_u32(0);
        enc.put_string("m");
        enc.put_u32(0);
        enc.put_u32(0);
        enc.put_u32((MAX_AUX_GIDS + 1) as u32);
        for _ in 0..=MAX_AUX_GIDS {
            enc.put_u32(0);
        }
        assert!(SysCredential::decode(&enc.into_bytes()).is_err());
    }
}
