use std::io::{self, Read};

use crate::error::{MQError, Result};
use crate::frame::Frame;
use crate::varint;

/// Fills `buf` completely, or reports a clean close if EOF lands exactly
/// on the first byte. An EOF after some bytes have already been read is a
/// framing error, not a clean close: the peer vanished mid-packet.
fn fill_or_eof<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => return Err(MQError::UnexpectedEof),
            Ok(n) => filled += n,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(MQError::Io(e)),
        }
    }
    Ok(true)
}

/// Reads exactly one framed control packet off `r`. Returns `Ok(None)` on
/// an orderly close observed before any byte of a new packet arrives.
pub fn read_frame<R: Read>(r: &mut R) -> Result<Option<Frame>> {
    let mut header = [0u8; 2];
    if !fill_or_eof(r, &mut header)? {
        return Ok(None);
    }

    let mut length_bytes = vec![header[1]];
    while length_bytes.last().copied().unwrap_or(0) & 0x80 != 0 {
        if length_bytes.len() >= 4 {
            return Err(MQError::MalformedRemainingLength);
        }
        let mut next = [0u8; 1];
        if !fill_or_eof(r, &mut next)? {
            return Err(MQError::UnexpectedEof);
        }
        length_bytes.push(next[0]);
    }

    let remaining = varint::decode(&length_bytes)? as usize;
    let fixed_header_len = 1 + length_bytes.len();
    let mut buf = vec![0u8; fixed_header_len + remaining];
    buf[0] = header[0];
    buf[1..fixed_header_len].copy_from_slice(&length_bytes);
    if remaining > 0 && !fill_or_eof(r, &mut buf[fixed_header_len..])? {
        return Err(MQError::UnexpectedEof);
    }

    Ok(Some(Frame::new(buf)))
}
