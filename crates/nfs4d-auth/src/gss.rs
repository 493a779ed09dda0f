use std::collections::HashMap;
use std::sync::Mutex;

use nfs4d_crypto::{Mic, MicKey};
use rand::RngCore;

use crate::error::{AuthError, AuthResult};

struct Context {
    key: MicKey,
}

/// Tracks every established GSS security context by its opaque context
/// id. A context's lifetime is otherwise owned by the GSS acceptor the
/// environment provides (§4.8): this registry only remembers the MIC
/// key negotiated for it.
#[derive(Default)]
pub struct GssRegistry {
    contexts: Mutex<HashMap<Vec<u8>, Context>>,
}

impl GssRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept an initial security token and establish a context,
    /// returning its id and the response token to send back. The MIC
    /// key is derived fresh per context; this is not a full GSS
    /// negotiation loop, since the server's only real dependency on GSS
    /// is the per-call MIC it protects once established.
    pub fn establish(&self, _init_token: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let mut context_id = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut context_id);
        let mut key_bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut key_bytes);
        let key = MicKey::from_bytes(key_bytes);
        self.contexts
            .lock()
            .expect("gss registry poisoned")
            .insert(context_id.to_vec(), Context { key });
        (context_id.to_vec(), context_id.to_vec())
    }

    pub fn is_established(&self, context_id: &[u8]) -> bool {
        self.contexts
            .lock()
            .expect("gss registry poisoned")
            .contains_key(context_id)
    }

    pub fn verify_mic(&self, context_id: &[u8], body: &[u8], mic_bytes: &[u8]) -> AuthResult<()> {
        let contexts = self.contexts.lock().expect("gss registry poisoned");
        let context = contexts.get(context_id).ok_or(AuthError::UnknownContext)?;
        let mic_array: [u8; 32] = mic_bytes
            .try_into()
            .map_err(|_| AuthError::MicMismatch)?;
        Mic(mic_array)
            .verify(&context.key, body)
            .map_err(|_| AuthError::MicMismatch)
    }

    pub fn sign(&self, context_id: &[u8], body: &[u8]) -> AuthResult<Mic> {
        let contexts = self.contexts.lock().expect("gss registry poisoned");
        let context = contexts.get(context_id).ok_or(AuthError::UnknownContext)?;
        Ok(Mic::compute(&context.key, body))
    }

    pub fn revoke(&self, context_id: &[u8]) {
        self.contexts
            .lock()
            .expect("gss registry poisoned")
            .remove(context_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn establish_then_sign_and_verify() {
        let registry = GssRegistry::new();
        let (context_id, _response_token) = registry.establish(b"init-token");
        assert!(registry.is_established(&context_id));
        let mic = registry.sign(&context_id, b"body").unwrap();
        registry.verify_mic(&context_id, b"body", &mic.0).unwrap();
    }

    #[test]
    fn verify_rejects_tampered_body() {
        let registry = GssRegistry::new();
        let (context_id, _) = registry.establish(b"init-token");
        let mic = registry.sign(&context_id, b"body").unwrap();
        assert!(registry.verify_mic(&context_id, b"other body", &mic.0).is_err());
    }

    #[test]
    fn unknown_context_is_rejected() {
        let registry = GssRegistry::new();
        assert!(registry.verify_mic(b"nope", b"body", &[0; 32]).is_err());
    }
}
