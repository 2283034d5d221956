//! ArtDmx packet (OpDmx)
//!
//! Body layout after the common header:
//!
//! ```text
//! 0       Sequence (1-255, 0 disables sequencing)
//! 1       Physical
//! 2..4    Port-Address (little-endian)
//! 4..6    Length (big-endian)
//! 6..     Data, `Length` bytes
//! ```

use lightwire_core::{DmxFrame, UNIVERSE_SIZE};

use super::address::PortAddress;
use super::header::{write_header, HEADER_LEN};
use super::opcode::OpCode;
use crate::error::{ArtNetError, Result};

/// Bytes between the header and the DMX data
pub const DMX_BODY_PREFIX: usize = 6;

/// Decoded ArtDmx packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtDmx {
    pub sequence: u8,
    pub physical: u8,
    pub address: PortAddress,
    pub frame: DmxFrame,
}

impl ArtDmx {
    /// Decode the body that follows the common header.
    ///
    /// A declared length beyond the available bytes is rejected with
    /// [`ArtNetError::TruncatedPacket`]; trailing bytes are ignored.
    pub fn decode(body: &[u8]) -> Result<Self> {
        if body.len() < DMX_BODY_PREFIX {
            return Err(ArtNetError::TruncatedPacket {
                declared: DMX_BODY_PREFIX,
                available: body.len(),
            });
        }

        let sequence = body[0];
        let physical = body[1];
        let address = PortAddress::decode(u16::from_le_bytes([body[2], body[3]]));
        let length = u16::from_be_bytes([body[4], body[5]]) as usize;

        if length > UNIVERSE_SIZE {
            return Err(ArtNetError::FrameTooLong(length));
        }

        let data = &body[DMX_BODY_PREFIX..];
        if data.len() < length {
            return Err(ArtNetError::TruncatedPacket {
                declared: length,
                available: data.len(),
            });
        }

        Ok(Self {
            sequence,
            physical,
            address,
            frame: DmxFrame::from_slice(&data[..length])?,
        })
    }

    /// Encode the body only, without the common header
    pub fn encode_body(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(DMX_BODY_PREFIX + self.frame.len());
        self.write_body(&mut buf);
        buf
    }

    /// Encode a complete packet including the header
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN + DMX_BODY_PREFIX + self.frame.len());
        write_header(&mut buf, OpCode::Dmx);
        self.write_body(&mut buf);
        buf
    }

    fn write_body(&self, buf: &mut Vec<u8>) {
        // DmxFrame never exceeds 512 values, so the length fits in u16
        let length = self.frame.len() as u16;

        buf.push(self.sequence);
        buf.push(self.physical);
        buf.extend_from_slice(&self.address.encode().to_le_bytes());
        buf.extend_from_slice(&length.to_be_bytes());
        buf.extend_from_slice(self.frame.as_slice());
    }
}

/// Rolling sequence byte: 1, 2, ..., 255, 1, ...
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceCounter {
    last: u8,
}

impl SequenceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance and return the next sequence number; never returns 0
    pub fn next_value(&mut self) -> u8 {
        self.last = (self.last % 255) + 1;
        self.last
    }

    /// Last value handed out, 0 before the first send
    pub fn current(&self) -> u8 {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::header::parse_header;

    fn packet(frame: &[u8]) -> ArtDmx {
        ArtDmx {
            sequence: 7,
            physical: 2,
            address: PortAddress::new(1, 2, 3),
            frame: DmxFrame::from_slice(frame).unwrap(),
        }
    }

    #[test]
    fn test_packet_structure() {
        let bytes = packet(&[0u8; 512]).encode();

        assert_eq!(&bytes[0..8], b"Art-Net\0");

        // OpCode (little-endian)
        assert_eq!(bytes[8], 0x00);
        assert_eq!(bytes[9], 0x50);

        // Protocol version
        assert_eq!(bytes[10], 0);
        assert_eq!(bytes[11], 14);

        assert_eq!(bytes[12], 7);
        assert_eq!(bytes[13], 2);

        // Port-Address 0x0123 (little-endian)
        assert_eq!(bytes[14], 0x23);
        assert_eq!(bytes[15], 0x01);

        // Length (big-endian)
        assert_eq!(bytes[16], 0x02);
        assert_eq!(bytes[17], 0x00);

        assert_eq!(bytes.len(), 18 + 512);
    }

    #[test]
    fn test_short_frame_length_is_actual_length() {
        let bytes = packet(&[9, 8, 7]).encode_body();
        assert_eq!(&bytes[4..6], &[0x00, 0x03]);
        assert_eq!(&bytes[6..], &[9, 8, 7]);
    }

    #[test]
    fn test_decode_after_header() {
        let original = packet(&[10, 20, 30, 40]);
        let bytes = original.encode();

        let (_, body) = parse_header(&bytes).unwrap();
        assert_eq!(ArtDmx::decode(body).unwrap(), original);
    }

    #[test]
    fn test_truncated_data_rejected() {
        let mut body = packet(&[1, 2, 3, 4]).encode_body();
        body.truncate(body.len() - 2);

        match ArtDmx::decode(&body) {
            Err(ArtNetError::TruncatedPacket {
                declared,
                available,
            }) => {
                assert_eq!(declared, 4);
                assert_eq!(available, 2);
            }
            other => panic!("Expected TruncatedPacket, got {:?}", other),
        }
    }

    #[test]
    fn test_truncated_prefix_rejected() {
        assert!(matches!(
            ArtDmx::decode(&[1, 0, 0]),
            Err(ArtNetError::TruncatedPacket { .. })
        ));
    }

    #[test]
    fn test_oversized_length_rejected() {
        let body = [1, 0, 0, 0, 0x02, 0x01];
        assert!(matches!(
            ArtDmx::decode(&body),
            Err(ArtNetError::FrameTooLong(513))
        ));
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let mut body = packet(&[5, 6]).encode_body();
        body.extend_from_slice(&[0xAA, 0xBB]);
        assert_eq!(ArtDmx::decode(&body).unwrap().frame.as_slice(), &[5, 6]);
    }

    #[test]
    fn test_sequence_rolls_over_to_one() {
        let mut seq = SequenceCounter::new();
        assert_eq!(seq.current(), 0);

        for expected in 1..=255u8 {
            assert_eq!(seq.next_value(), expected);
        }
        assert_eq!(seq.next_value(), 1);
        assert_eq!(seq.next_value(), 2);
    }
}
