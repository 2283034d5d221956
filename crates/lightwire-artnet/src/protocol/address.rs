//! Port-Address encoding
//!
//! Art-Net 4 addresses a universe with a 15 bit Port-Address:
//! Net in bits 8-14, Sub-Net in bits 4-7, Universe in bits 0-3.

use serde::{Deserialize, Serialize};
use std::fmt;

const UNIVERSE_MASK: u16 = 0x000F;
const SUBNET_MASK: u16 = 0x00F0;
const SUBNET_SHIFT: u16 = 4;
const NETWORK_MASK: u16 = 0x7F00;
const NETWORK_SHIFT: u16 = 8;

/// Network / subnet / universe triple
///
/// Fields wider than their slot are truncated by masking when encoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortAddress {
    /// Net (0-127)
    pub network: u8,
    /// Sub-Net (0-15)
    pub subnet: u8,
    /// Universe (0-15)
    pub universe: u8,
}

impl PortAddress {
    pub fn new(network: u8, subnet: u8, universe: u8) -> Self {
        Self {
            network,
            subnet,
            universe,
        }
    }

    /// Pack into the 15 bit wire form
    pub fn encode(&self) -> u16 {
        let universe = u16::from(self.universe) & UNIVERSE_MASK;
        let subnet = (u16::from(self.subnet) << SUBNET_SHIFT) & SUBNET_MASK;
        let network = (u16::from(self.network) << NETWORK_SHIFT) & NETWORK_MASK;
        universe | subnet | network
    }

    /// Unpack from the wire form; bit 15 is ignored
    pub fn decode(raw: u16) -> Self {
        Self {
            network: ((raw & NETWORK_MASK) >> NETWORK_SHIFT) as u8,
            subnet: ((raw & SUBNET_MASK) >> SUBNET_SHIFT) as u8,
            universe: (raw & UNIVERSE_MASK) as u8,
        }
    }

    /// The same address with every field masked to its slot width
    pub fn normalized(&self) -> Self {
        Self::decode(self.encode())
    }
}

impl From<u16> for PortAddress {
    fn from(raw: u16) -> Self {
        Self::decode(raw)
    }
}

impl From<PortAddress> for u16 {
    fn from(address: PortAddress) -> Self {
        address.encode()
    }
}

impl fmt::Display for PortAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.network, self.subnet, self.universe)
    }
}
