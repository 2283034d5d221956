//! Art-Net wire codec
//!
//! Art-Net is a UDP protocol for transmitting DMX512 over Ethernet. Every
//! packet starts with the same 12 byte header, followed by an OpCode specific
//! body. Multi-byte fields are little-endian except the ArtDmx data length.
//!
//! Only [`ArtDmx`] and a minimal [`ArtPoll`] are implemented.

pub mod address;
pub mod dmx;
pub mod header;
pub mod opcode;
pub mod poll;

pub use address::PortAddress;
pub use dmx::{ArtDmx, SequenceCounter};
pub use header::{encode_header, parse_header, write_header, ArtNetHeader, ARTNET_ID, HEADER_LEN};
pub use opcode::OpCode;
pub use poll::ArtPoll;
