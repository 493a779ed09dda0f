use crate::error::CryptoError;

/// A GSS context key, established out-of-band by the GSS acceptor the
/// environment provides. Opaque to this crate beyond its byte content.
#[derive(Clone, PartialEq, Eq)]
pub struct MicKey(pub [u8; 32]);

impl MicKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// A Message Integrity Code over one RPC call or reply body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mic(pub [u8; 32]);

impl Mic {
    /// Compute the MIC of `body` under `key` as a keyed BLAKE3 hash.
    pub fn compute(key: &MicKey, body: &[u8]) -> Self {
        let hash = blake3::keyed_hash(&key.0, body);
        Self(*hash.as_bytes())
    }

    /// Verify `self` is the MIC of `body` under `key`.
    pub fn verify(&self, key: &MicKey, body: &[u8]) -> Result<(), CryptoError> {
        let expected = Self::compute(key, body);
        if expected.0 == self.0 {
            Ok(())
        } else {
            Err(CryptoError::MicMismatch)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let key = MicKey::from_bytes([7u8; 32]);
        let mic = Mic::compute(&key, b"call body");
        assert!(mic.verify(&key, b"call body").is_ok());
    }

    #[test]
    fn rejects_tampered_body() {
        let key = MicKey::from_bytes([7u8; 32]);
        let mic = Mic::compute(&key, b"call body");
        assert_eq!(
            mic.verify(&key, b"tampered body").unwrap_err(),
            CryptoError::MicMismatch
        );
    }

    #[test]
    fn rejects_wrong_key() {
        let key = MicKey::from_bytes([7u8; 32]);
        let other = MicKey::from_bytes([9u8; 32]);
        let mic = Mic::compute(&key, b"call body");
        assert!(mic.verify(&other, b"call body").is_err());
    }
}
