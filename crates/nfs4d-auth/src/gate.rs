use nfs4d_rpc::{CredFlavor, OpaqueAuth};

use crate::error::{AuthError, AuthResult};
use crate::gss::GssRegistry;
use crate::model::{Credentials, GssCredential, SysCredential};

/// What [`AuthGate::verify`] produced for one call.
pub enum VerifyOutcome {
    /// The call carries a usable identity; `reply_verifier` goes back
    /// on the wire as the reply's verifier field.
    Authenticated {
        credentials: Credentials,
        reply_verifier: OpaqueAuth,
    },
    /// A GSS context handshake is still in progress; the caller must
    /// send `reply_verifier`'s token back and retry before any
    /// operation can proceed.
    ContinueNegotiation { reply_verifier: OpaqueAuth },
}

/// Verifies call credentials and authorizes access, per §4.8.
#[derive(Default)]
pub struct AuthGate {
    gss: GssRegistry,
}

impl AuthGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// `verify(call_header) -> (Ok, reply_verifier) | AuthError`, per
    /// §4.8. `call_body` is the already-read body the GSS MIC, if any,
    /// protects.
    pub fn verify(&self, cred: &OpaqueAuth, verf: &OpaqueAuth, call_body: &[u8]) -> AuthResult<VerifyOutcome> {
        match cred.flavor {
            CredFlavor::Sys => {
                let sys = SysCredential::decode(&cred.body)?;
                Ok(VerifyOutcome::Authenticated {
                    credentials: Credentials::Sys(sys),
                    reply_verifier: OpaqueAuth::none(),
                })
            }
            CredFlavor::Gss => self.verify_gss(cred, verf, call_body),
            CredFlavor::None => Err(AuthError::UnsupportedFlavor(0)),
            CredFlavor::Unknown(flavor) => Err(AuthError::UnsupportedFlavor(flavor)),
        }
    }

    fn verify_gss(&self, cred: &OpaqueAuth, verf: &OpaqueAuth, call_body: &[u8]) -> AuthResult<VerifyOutcome> {
        match GssCredential::decode(&cred.body)? {
            GssCredential::Init { token } => {
                let (context_id, response_token) = self.gss.establish(&token);
                // The context id travels alongside the response token so
                // the caller can present it on the next call.
                let mut enc = nfs4d_rpc::Encoder::new();
                enc.put_opaque(&context_id);
                enc.put_opaque(&response_token);
                Ok(VerifyOutcome::ContinueNegotiation {
                    reply_verifier: OpaqueAuth {
                        flavor: CredFlavor::Gss,
                        body: enc.into_bytes(),
                    },
                })
            }
            GssCredential::Established { context_id, .. } => {
                if !self.gss.is_established(&context_id) {
                    return Err(AuthError::ContextNotEstablished);
                }
                if verf.body.is_empty() {
                    return Err(AuthError::MicMissing);
                }
                self.gss.verify_mic(&context_id, call_body, &verf.body)?;
                let reply_mic = self.gss.sign(&context_id, call_body)?;
                Ok(VerifyOutcome::Authenticated {
                    credentials: Credentials::Gss { context_id },
                    reply_verifier: OpaqueAuth {
                        flavor: CredFlavor::Gss,
                        body: reply_mic.0.to_vec(),
                    },
                })
            }
        }
    }

    /// Drop a GSS context, e.g. on connection close.
    pub fn revoke_context(&self, context_id: &[u8]) {
        self.gss.revoke(context_id);
    }

    /// `authorize(credentials, path, required_access_mask) -> bool`. An
    /// authenticated identity -- SYS is trusted outright, GSS only once
    /// its context is established, both preconditions already enforced
    /// by [`Self::verify`] -- is authorized for every access mask this
    /// server defines. A full per-path ACL model is out of scope; this
    /// predicate exists so the compound engine has one place to call
    /// before any operation that reads or mutates.
    pub fn authorize(&self, _credentials: &Credentials, _path: &str, _required_access_mask: u32) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nfs4d_rpc::{CredFlavor, OpaqueAuth};

    #[test]
    fn sys_credential_is_trusted_outright() {
        let gate = AuthGate::new();
        let sys = SysCredential {
            stamp: 1,
            machine_name: "host".into(),
            uid: 500,
            gid: 500,
            aux_gids: vec![],
        };
        let cred = OpaqueAuth {
            flavor: CredFlavor::Sys,
            body: sys.encode(),
        };
        let outcome = gate.verify(&cred, &OpaqueAuth::none(), b"body").unwrap();
        assert!(matches!(outcome, VerifyOutcome::Authenticated { .. }));
    }

    #[test]
    fn unsupported_flavor_is_rejected() {
        let gate = AuthGate::new();
        let cred = OpaqueAuth {
            flavor: CredFlavor::Unknown(99),
            body: vec![],
        };
        assert!(gate.verify(&cred, &OpaqueAuth::none(), b"body").is_err());
    }

    #[test]
    fn gss_handshake_then_established_call_round_trips() {
        let gate = AuthGate::new();
        let init_cred = OpaqueAuth {
            flavor: CredFlavor::Gss,
            body: GssCredential::Init { token: vec![1, 2, 3] }.encode(),
        };
        let outcome = gate.verify(&init_cred, &OpaqueAuth::none(), b"body").unwrap();
        let context_id = match outcome {
            VerifyOutcome::ContinueNegotiation { reply_verifier } => {
                let mut dec = nfs4d_rpc::Decoder::new(&reply_verifier.body);
                dec.get_opaque().unwrap()
            }
            _ => panic!("expected negotiation to continue"),
        };

        let established_cred = OpaqueAuth {
            flavor: CredFlavor::Gss,
            body: GssCredential::Established {
                context_id: context_id.clone(),
                seq_num: 1,
            }
            .encode(),
        };
        let mic = gate.gss.sign(&context_id, b"body").unwrap();
        let verf = OpaqueAuth {
            flavor: CredFlavor::Gss,
            body: mic.0.to_vec(),
        };
        let outcome = gate.verify(&established_cred, &verf, b"body").unwrap();
        assert!(matches!(outcome, VerifyOutcome::Authenticated { .. }));
    }

    #[test]
    fn established_call_without_mic_is_rejected() {
        let gate = AuthGate::new();
        let init_cred = OpaqueAuth {
            flavor: CredFlavor::Gss,
            body: GssCredential::Init { token: vec![] }.encode(),
        };
        let outcome = gate.verify(&init_cred, &OpaqueAuth::none(), b"body").unwrap();
        let context_id = match outcome {
            VerifyOutcome::ContinueNegotiation { reply_verifier } => {
                let mut dec = nfs4d_rpc::Decoder::new(&reply_verifier.body);
                dec.get_opaque().unwrap()
            }
            _ => panic!("expected negotiation to continue"),
        };
        let established_cred = OpaqueAuth {
            flavor: CredFlavor::Gss,
            body: GssCredential::Established { context_id, seq_num: 1 }.encode(),
        };
        assert!(gate.verify(&established_cred, &OpaqueAuth::none(), b"body").is_err());
    }
}
