//! Common packet header
//!
//! ```text
//! 0..8    "Art-Net\0"
//! 8..10   OpCode (little-endian)
//! 10      ProtVerHi (0)
//! 11      ProtVerLo (>= 14)
//! ```

use crate::error::{ArtNetError, Result};

use super::opcode::OpCode;

/// Packet identifier
pub const ARTNET_ID: &[u8; 8] = b"Art-Net\0";
/// Header length in bytes
pub const HEADER_LEN: usize = 12;
/// Protocol version written on every packet
pub const PROTOCOL_VERSION: (u8, u8) = (0, 14);
/// Lowest accepted ProtVerLo
pub const MIN_PROTOCOL_VERSION_LO: u8 = 14;

/// Parsed header fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtNetHeader {
    /// Raw opcode; may not be a known [`OpCode`]
    pub opcode: u16,
    pub version_hi: u8,
    pub version_lo: u8,
}

impl ArtNetHeader {
    pub fn op(&self) -> Option<OpCode> {
        OpCode::from_u16(self.opcode)
    }
}

/// Validate the header and split off the body.
///
/// Fails with [`ArtNetError::MalformedHeader`] when the identifier differs,
/// ProtVerHi is not 0, ProtVerLo is below 14 or the buffer is too short.
pub fn parse_header(bytes: &[u8]) -> Result<(ArtNetHeader, &[u8])> {
    let id_valid = bytes.len() >= ARTNET_ID.len() && &bytes[..ARTNET_ID.len()] == ARTNET_ID;

    let opcode = match bytes.get(8..10) {
        Some(raw) => u16::from_le_bytes([raw[0], raw[1]]),
        None => 0,
    };
    let version_hi = bytes.get(10).copied().unwrap_or(0);
    let version_lo = bytes.get(11).copied().unwrap_or(0);

    let complete = bytes.len() >= HEADER_LEN;
    if !(complete && id_valid && version_hi == 0 && version_lo >= MIN_PROTOCOL_VERSION_LO) {
        return Err(ArtNetError::MalformedHeader {
            id_valid,
            opcode,
            version_hi,
            version_lo,
        });
    }

    Ok((
        ArtNetHeader {
            opcode,
            version_hi,
            version_lo,
        },
        &bytes[HEADER_LEN..],
    ))
}

/// Append a header for `opcode` to `buf`
pub fn write_header(buf: &mut Vec<u8>, opcode: OpCode) {
    buf.extend_from_slice(ARTNET_ID);
    buf.extend_from_slice(&opcode.as_u16().to_le_bytes());
    buf.push(PROTOCOL_VERSION.0);
    buf.push(PROTOCOL_VERSION.1);
}

/// Encode a standalone header for `opcode`
pub fn encode_header(opcode: OpCode) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN);
    write_header(&mut buf, opcode);
    buf
}
