//! ArtPoll packet (OpPoll)
//!
//! Only the two leading body fields are modelled. Poll replies are not sent.

use super::header::write_header;
use super::opcode::OpCode;

/// ArtPoll body
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArtPoll {
    /// Flags controlling how nodes reply
    pub talk_to_me: u8,
    /// Lowest diagnostics priority to be sent
    pub priority: u8,
}

impl ArtPoll {
    /// Decode the body; missing fields read as 0
    pub fn decode(body: &[u8]) -> Self {
        Self {
            talk_to_me: body.first().copied().unwrap_or(0),
            priority: body.get(1).copied().unwrap_or(0),
        }
    }

    /// Encode a complete packet including the header
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(14);
        write_header(&mut buf, OpCode::Poll);
        buf.push(self.talk_to_me);
        buf.push(self.priority);
        buf
    }
}
