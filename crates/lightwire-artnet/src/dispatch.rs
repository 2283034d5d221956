//! Opcode dispatch for received datagrams

use std::net::SocketAddr;
use tracing::{debug, trace, warn};

use crate::error::{ArtNetError, Result};
use crate::protocol::{parse_header, ArtDmx, ArtPoll, OpCode};
use crate::registry::UniverseRegistry;

/// Handlers for the opcodes this node understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    /// ArtDmx: deliver to the addressed universe
    Dmx,
    /// ArtPoll: logged only
    Poll,
}

/// Find the handler for a raw opcode
pub fn handler_for(opcode: u16) -> Result<Handler> {
    match OpCode::from_u16(opcode) {
        Some(OpCode::Dmx) => Ok(Handler::Dmx),
        Some(OpCode::Poll) => Ok(Handler::Poll),
        _ => Err(ArtNetError::UnknownOpcode(opcode)),
    }
}

/// Parse one datagram and route it.
///
/// Errors describe why the packet was dropped; none of them affect later
/// packets.
pub fn handle_packet(
    registry: &UniverseRegistry,
    bytes: &[u8],
    source: SocketAddr,
) -> Result<Handler> {
    let (header, body) = parse_header(bytes)?;
    let handler = handler_for(header.opcode)?;

    match handler {
        Handler::Dmx => {
            let packet = ArtDmx::decode(body)?;
            trace!(
                "ArtDmx from {} for {} seq {} ({} values)",
                source,
                packet.address,
                packet.sequence,
                packet.frame.len()
            );
            let universe = registry.get_or_create(packet.address)?;
            if !universe.deliver(packet) {
                debug!("Universe {} is stopped, dropping frame", universe.address());
            }
        }
        Handler::Poll => {
            let poll = ArtPoll::decode(body);
            debug!(
                "ArtPoll from {}: talk_to_me {:#04x}, priority {}",
                source, poll.talk_to_me, poll.priority
            );
        }
    }

    Ok(handler)
}

/// Log a dropped packet at a level matching the reason
pub fn log_rejection(err: &ArtNetError, source: SocketAddr) {
    match err {
        ArtNetError::MalformedHeader {
            id_valid,
            opcode,
            version_hi,
            version_lo,
        } => warn!(
            "Dropping packet from {}: bad header (id valid: {}, opcode {:#06x}, version {}.{})",
            source, id_valid, opcode, version_hi, version_lo
        ),
        ArtNetError::UnknownOpcode(opcode) => {
            debug!("Dropping packet from {}: no handler for {:#06x}", source, opcode)
        }
        other => warn!("Dropping packet from {}: {}", source, other),
    }
}
