use crate::error::{RpcError, RpcResult};

/// Longest opaque/string payload the decoder accepts in one field. Not
/// part of the wire format; a sanity bound so a corrupt length field
/// can't trigger an unbounded allocation.
pub const MAX_OPAQUE_LEN: u32 = 64 * 1024 * 1024;

/// Appends XDR-encoded primitives to an output buffer: `u32`/`u64`
/// big-endian, booleans as a `u32` 0/1, and opaque/string payloads as a
/// length prefix followed by the bytes zero-padded to a 4-byte
/// boundary.
#[derive(Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn put_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn put_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn put_bool(&mut self, v: bool) {
        self.put_u32(if v { 1 } else { 0 });
    }

    pub fn put_opaque(&mut self, bytes: &[u8]) {
        self.put_u32(bytes.len() as u32);
        self.buf.extend_from_slice(bytes);
        let padding = (4 - (bytes.len() % 4)) % 4;
        self.buf.extend(std::iter::repeat(0u8).take(padding));
    }

    pub fn put_string(&mut self, s: &str) {
        self.put_opaque(s.as_bytes());
    }
}

/// Reads XDR primitives out of a borrowed buffer, advancing a cursor
/// and rejecting truncated input or an over-long length field.
pub struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, len: usize) -> RpcResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(RpcError::BadEncoding(format!(
                "need {} bytes, have {}",
                len,
                self.remaining()
            )));
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn get_u32(&mut self) -> RpcResult<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes(bytes.try_into().unwrap()))
    }

    pub fn get_u64(&mut self) -> RpcResult<u64> {
        let bytes = self.take(8)?;
        Ok(u64::from_be_bytes(bytes.try_into().unwrap()))
    }

    pub fn get_bool(&mut self) -> RpcResult<bool> {
        Ok(self.get_u32()? != 0)
    }

    pub fn get_opaque(&mut self) -> RpcResult<Vec<u8>> {
        let len = self.get_u32()?;
        if len > MAX_OPAQUE_LEN {
            return Err(RpcError::BadEncoding(format!(
                "opaque length {len} exceeds the {MAX_OPAQUE_LEN} byte cap"
            )));
        }
        let payload = self.take(len as usize)?.to_vec();
        let padding = (4 - (len as usize % 4)) % 4;
        self.take(padding)?;
        Ok(payload)
    }

    pub fn get_string(&mut self) -> RpcResult<String> {
        let bytes = self.get_opaque()?;
        String::from_utf8(bytes).map_err(|e| RpcError::BadEncoding(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u32_roundtrips() {
        let mut enc = Encoder::new();
        enc.put_u32(0xdead_beef);
        let bytes = enc.into_bytes();
        assert_eq!(bytes, vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(Decoder::new(&bytes).get_u32().unwrap(), 0xdead_beef);
    }

    #[test]
    fn opaque_is_padded_to_four_bytes() {
        let mut enc = Encoder::new();
        enc.put_opaque(b"abc");
        let bytes = enc.into_bytes();
        // 4 (len) + 3 (payload) + 1 (pad) = 8
        assert_eq!(bytes.len(), 8);
        let mut dec = Decoder::new(&bytes);
        assert_eq!(dec.get_opaque().unwrap(), b"abc");
        assert_eq!(dec.remaining(), 0);
    }

    #[test]
    fn string_roundtrips() {
        let mut enc = Encoder::new();
        enc.put_string("hello");
        let bytes = enc.into_bytes();
        assert_eq!(Decoder::new(&bytes).get_string().unwrap(), "hello");
    }

    #[test]
    fn truncated_input_is_bad_encoding() {
        let bytes = [0u8, 0, 0];
        assert!(Decoder::new(&bytes).get_u32().is_err());
    }

    #[test]
    fn oversized_length_field_is_rejected() {
        let mut enc = Encoder::new();
        enc.put_u32(MAX_OPAQUE_LEN + 1);
        let bytes = enc.into_bytes();
        assert!(Decoder::new(&bytes).get_opaque().is_err());
    }

    #[test]
    fn bool_roundtrips() {
        let mut enc = Encoder::new();
        enc.put_bool(true);
        enc.put_bool(false);
        let bytes = enc.into_bytes();
        let mut dec = Decoder::new(&bytes);
        assert!(dec.get_bool().unwrap());
        assert!(!dec.get_bool().unwrap());
    }
}
