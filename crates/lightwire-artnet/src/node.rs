//! UDP node
//!
//! [`ArtNetNode`] binds the receive sockets, owns the [`UniverseRegistry`] and
//! runs one receive loop per socket. Every datagram is handled on the blocking
//! pool so that a slow handler never holds up the next `recv_from`.

use std::future::Future;
use std::net::{SocketAddr, UdpSocket as StdUdpSocket};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::config::NodeConfig;
use crate::dispatch::{handle_packet, log_rejection};
use crate::error::{ArtNetError, Result};
use crate::protocol::ArtPoll;
use crate::registry::UniverseRegistry;
use crate::transport::{bind_sender, PacketTransport};

const RECV_BACKOFF_MIN: Duration = Duration::from_millis(10);
const RECV_BACKOFF_MAX: Duration = Duration::from_secs(1);
/// Repeated receive errors are logged once per this many
const RECV_ERROR_LOG_EVERY: u64 = 100;

/// Pacing for a receive loop whose socket keeps failing
#[derive(Debug, Default)]
struct RecvBackoff {
    consecutive: u64,
}

impl RecvBackoff {
    /// Record a failure; returns the delay and whether to log it
    fn failed(&mut self) -> (Duration, bool) {
        self.consecutive += 1;
        let shift = (self.consecutive - 1).min(7) as u32;
        let delay = (RECV_BACKOFF_MIN * 2u32.pow(shift)).min(RECV_BACKOFF_MAX);
        let log = self.consecutive == 1 || self.consecutive % RECV_ERROR_LOG_EVERY == 0;
        (delay, log)
    }

    fn succeeded(&mut self) {
        self.consecutive = 0;
    }
}

/// Datagram counters for the whole node
#[derive(Debug, Default)]
pub struct NodeStats {
    pub datagrams: AtomicU64,
    pub dropped: AtomicU64,
}

impl NodeStats {
    pub fn datagrams(&self) -> u64 {
        self.datagrams.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Art-Net node: receive sockets, send socket and universe registry
pub struct ArtNetNode {
    receivers: Vec<Arc<UdpSocket>>,
    sender: Arc<StdUdpSocket>,
    target: SocketAddr,
    registry: Arc<UniverseRegistry>,
    recv_buffer_size: usize,
    stats: Arc<NodeStats>,
}

impl ArtNetNode {
    /// Bind using the configured broadcast address as the send target.
    ///
    /// Must be called inside a tokio runtime.
    pub fn bind(config: &NodeConfig) -> Result<Self> {
        Self::bind_to(config, config.target())
    }

    /// Bind and send outgoing packets to `target`
    pub fn bind_to(config: &NodeConfig, target: SocketAddr) -> Result<Self> {
        config.validate()?;

        let mut receivers = vec![Arc::new(bind_receiver(config.bind())?)];
        if config.listen_broadcast {
            match bind_receiver(config.broadcast_bind()) {
                Ok(socket) => receivers.push(Arc::new(socket)),
                Err(e) => warn!(
                    "Could not listen on broadcast address {}: {}",
                    config.broadcast_bind(),
                    e
                ),
            }
        }

        let sender = Arc::new(bind_sender(SocketAddr::new(
            config.bind_address.into(),
            0,
        ))?);
        let transport: Arc<dyn PacketTransport> = sender.clone();
        let registry = Arc::new(UniverseRegistry::new(
            transport,
            target,
            config.scheduler_config(),
        ));

        for universe in &config.universes {
            let entity = registry.get_or_create(universe.address())?;
            if universe.physical != 0 {
                entity.set_local_physical(universe.physical);
            }
        }

        for socket in &receivers {
            info!("Art-Net node listening on {}", socket.local_addr()?);
        }
        info!("Art-Net output to {}", target);

        Ok(Self {
            receivers,
            sender,
            target,
            registry,
            recv_buffer_size: config.recv_buffer_size,
            stats: Arc::new(NodeStats::default()),
        })
    }

    pub fn registry(&self) -> Arc<UniverseRegistry> {
        self.registry.clone()
    }

    pub fn stats(&self) -> Arc<NodeStats> {
        self.stats.clone()
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Local addresses of the receive sockets
    pub fn local_addrs(&self) -> Result<Vec<SocketAddr>> {
        self.receivers
            .iter()
            .map(|s| s.local_addr().map_err(ArtNetError::from))
            .collect()
    }

    /// Broadcast an ArtPoll to the output target
    pub fn broadcast_poll(&self) -> Result<usize> {
        let packet = ArtPoll::default().encode();
        self.sender
            .send_to(&packet, self.target)
            .map_err(ArtNetError::SendFailure)
    }

    /// Receive until `shutdown` completes
    pub async fn run<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let mut loops = JoinSet::new();
        for socket in &self.receivers {
            loops.spawn(receive_loop(
                socket.clone(),
                self.registry.clone(),
                self.stats.clone(),
                self.recv_buffer_size,
            ));
        }

        tokio::select! {
            _ = shutdown => info!("Art-Net node shutting down"),
            Some(result) = loops.join_next() => {
                if let Err(e) = result {
                    warn!("Receive loop ended: {}", e);
                }
            }
        }

        loops.abort_all();
        Ok(())
    }
}

fn bind_receiver(address: SocketAddr) -> Result<UdpSocket> {
    let socket = StdUdpSocket::bind(address)?;
    socket.set_broadcast(true)?;
    socket.set_nonblocking(true)?;
    Ok(UdpSocket::from_std(socket)?)
}

async fn receive_loop(
    socket: Arc<UdpSocket>,
    registry: Arc<UniverseRegistry>,
    stats: Arc<NodeStats>,
    buffer_size: usize,
) {
    let mut buf = vec![0u8; buffer_size];
    let mut backoff = RecvBackoff::default();

    loop {
        let (len, source) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                let (delay, log) = backoff.failed();
                if log {
                    warn!(
                        "Receive error ({} in a row, retrying in {:?}): {}",
                        backoff.consecutive, delay, e
                    );
                }
                tokio::time::sleep(delay).await;
                continue;
            }
        };
        backoff.succeeded();
        stats.datagrams.fetch_add(1, Ordering::Relaxed);

        let datagram = buf[..len].to_vec();
        let registry = registry.clone();
        let stats = stats.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = handle_packet(&registry, &datagram, source) {
                stats.dropped.fetch_add(1, Ordering::Relaxed);
                log_rejection(&e, source);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_and_caps() {
        let mut backoff = RecvBackoff::default();

        assert_eq!(backoff.failed(), (Duration::from_millis(10), true));
        assert_eq!(backoff.failed(), (Duration::from_millis(20), false));
        assert_eq!(backoff.failed(), (Duration::from_millis(40), false));

        for _ in 3..50 {
            backoff.failed();
        }
        assert_eq!(backoff.failed().0, RECV_BACKOFF_MAX);
    }

    #[test]
    fn test_backoff_rate_limits_warnings() {
        let mut backoff = RecvBackoff::default();
        let logged = (0..250).filter(|_| backoff.failed().1).count();
        // First failure, then the 100th and 200th
        assert_eq!(logged, 3);
    }

    #[test]
    fn test_backoff_resets_after_success() {
        let mut backoff = RecvBackoff::default();
        for _ in 0..10 {
            backoff.failed();
        }
        backoff.succeeded();
        assert_eq!(backoff.failed(), (Duration::from_millis(10), true));
    }
}
