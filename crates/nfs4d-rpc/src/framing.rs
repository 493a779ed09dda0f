use std::io::{Read, Write};

use crate::error::{RpcError, RpcResult};

/// Longest single record this frontend accepts, a sanity bound against
/// a corrupt or hostile length prefix.
pub const MAX_RECORD_LEN: u32 = 64 * 1024 * 1024;

/// Read one length-prefixed record: a 4-byte big-endian length followed
/// by that many bytes (§4.9's framing rule). Returns `Ok(None)` on a
/// clean EOF before any bytes of the length prefix are read -- the
/// frontend treats that as the peer closing the connection.
pub fn read_record<R: Read>(reader: &mut R) -> RpcResult<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match read_exact_or_eof(reader, &mut len_buf)? {
        false => return Ok(None),
        true => {}
    }
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_RECORD_LEN {
        return Err(RpcError::BadEncoding(format!(
            "record length {len} exceeds the {MAX_RECORD_LEN} byte cap"
        )));
    }
    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload)?;
    Ok(Some(payload))
}

/// Write one length-prefixed record.
pub fn write_record<W: Write>(writer: &mut W, payload: &[u8]) -> RpcResult<()> {
    let len = payload.len() as u32;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(payload)?;
    Ok(())
}

/// Like `Read::read_exact` but returns `Ok(false)` instead of an error
/// when zero bytes are available before the buffer is touched at all,
/// and an error only on a genuine mid-record truncation.
fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> RpcResult<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                if filled == 0 {
                    return Ok(false);
                }
                return Err(RpcError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "connection closed mid-record",
                )));
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(RpcError::Io(e)),
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn roundtrips_a_record() {
        let mut buf = Vec::new();
        write_record(&mut buf, b"hello").unwrap();
        let mut cursor = Cursor::new(buf);
        let record = read_record(&mut cursor).unwrap().unwrap();
        assert_eq!(record, b"hello");
    }

    #[test]
    fn clean_eof_before_any_bytes_is_connection_close() {
        let mut cursor = Cursor::new(Vec::new());
        assert!(read_record(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn truncated_mid_length_prefix_is_an_error() {
        let mut cursor = Cursor::new(vec![0u8, 0]);
        assert!(read_record(&mut cursor).is_err());
    }

    #[test]
    fn oversized_length_is_rejected() {
        let mut cursor = Cursor::new((MAX_RECORD_LEN + 1).to_be_bytes().to_vec());
        assert!(read_record(&mut cursor).is_err());
    }
}
