//! Packet transport abstraction
//!
//! Transmit workers send through a [`PacketTransport`] so that tests can
//! capture outgoing packets without opening sockets.

use std::io;
use std::net::{SocketAddr, UdpSocket};

/// Sends one datagram to a destination
pub trait PacketTransport: Send + Sync {
    fn send_to(&self, packet: &[u8], target: SocketAddr) -> io::Result<usize>;
}

impl PacketTransport for UdpSocket {
    fn send_to(&self, packet: &[u8], target: SocketAddr) -> io::Result<usize> {
        UdpSocket::send_to(self, packet, target)
    }
}

/// Bind a send-only socket with broadcast enabled
pub fn bind_sender(bind: SocketAddr) -> io::Result<UdpSocket> {
    let socket = UdpSocket::bind(bind)?;
    socket.set_broadcast(true)?;
    Ok(socket)
}
