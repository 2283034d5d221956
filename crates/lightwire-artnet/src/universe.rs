//! Art-Net universe entity
//!
//! A [`Universe`] owns two workers:
//!
//! - **ingress** receives decoded [`ArtDmx`] packets addressed to it, records
//!   the remote physical port and forwards the frame to the output port
//! - **transmit** runs a [`TransmitScheduler`] that encodes frames written to
//!   the input port as ArtDmx and sends them to the configured target
//!
//! Both ports are unbuffered. The ingress worker keeps accepting packets while
//! its output is not being read; an unread frame is replaced by the next one.

use crossbeam_channel::{select, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use std::net::SocketAddr;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, trace, warn};

use lightwire_core::port::rendezvous;
use lightwire_core::{
    CoreError, DmxFrame, FrameSink, FrameSource, InputHandle, OutputHandle, PortClaim, ValueKind,
};

use crate::error::{ArtNetError, Result};
use crate::protocol::{ArtDmx, PortAddress, SequenceCounter};
use crate::scheduler::{
    FrameTransmitter, SchedulerConfig, SchedulerHandle, TransmitCommand, TransmitReason,
    TransmitScheduler,
};
use crate::transport::PacketTransport;

/// Diagnostics view of a universe, written by its workers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniverseSnapshot {
    pub address: PortAddress,
    /// Physical port stamped on outgoing packets
    pub local_physical: u8,
    /// Physical port of the last received packet
    pub remote_physical: u8,
    /// Sequence number of the last sent packet (0 before the first)
    pub sequence: u8,
    /// Most recently sent frame
    pub last_frame: Option<DmxFrame>,
    pub paused: bool,
    pub frames_received: u64,
    pub frames_forwarded: u64,
    /// Received frames replaced before anyone read them
    pub frames_superseded: u64,
    pub packets_sent: u64,
    pub send_failures: u64,
    pub keepalive_resends: u64,
}

type SharedSnapshot = Arc<RwLock<UniverseSnapshot>>;

/// Claimed output port of a universe; dropping it frees the port again
#[derive(Debug)]
pub struct ClaimedOutput {
    frames: Receiver<DmxFrame>,
    _claim: PortClaim,
}

impl Deref for ClaimedOutput {
    type Target = Receiver<DmxFrame>;

    fn deref(&self) -> &Self::Target {
        &self.frames
    }
}

/// Encodes frames as ArtDmx and hands them to the transport
struct ArtDmxTransmitter {
    address: PortAddress,
    physical: u8,
    sequence: SequenceCounter,
    transport: Arc<dyn PacketTransport>,
    target: SocketAddr,
    snapshot: SharedSnapshot,
}

impl FrameTransmitter for ArtDmxTransmitter {
    fn transmit(&mut self, frame: &DmxFrame, reason: TransmitReason) {
        let packet = ArtDmx {
            sequence: self.sequence.next_value(),
            physical: self.physical,
            address: self.address,
            frame: frame.clone(),
        };
        let result = self.transport.send_to(&packet.encode(), self.target);

        let mut snapshot = self.snapshot.write();
        snapshot.sequence = packet.sequence;
        snapshot.last_frame = Some(packet.frame);
        match result {
            Ok(_) => {
                trace!(
                    "Sent ArtDmx {} seq {} to {} ({:?})",
                    self.address,
                    packet.sequence,
                    self.target,
                    reason
                );
                snapshot.packets_sent += 1;
                if reason == TransmitReason::Keepalive {
                    snapshot.keepalive_resends += 1;
                }
            }
            Err(e) => {
                // Not retried; the next keepalive carries the same state
                let err = ArtNetError::SendFailure(e);
                warn!("Universe {}: {}", self.address, err);
                snapshot.send_failures += 1;
            }
        }
    }

    fn set_physical(&mut self, physical: u8) {
        self.physical = physical;
        self.snapshot.write().local_physical = physical;
    }
}

/// One network universe with its ingress and transmit workers
pub struct Universe {
    address: PortAddress,
    ingress: Sender<ArtDmx>,
    output: Receiver<DmxFrame>,
    output_claimed: Arc<AtomicBool>,
    transmit: Mutex<SchedulerHandle>,
    ingress_stop: Mutex<Option<Sender<()>>>,
    ingress_worker: Mutex<Option<JoinHandle<()>>>,
    snapshot: SharedSnapshot,
}

impl Universe {
    /// Create a universe and start its workers.
    ///
    /// Outgoing packets are sent through `transport` to `target`.
    pub fn new(
        address: PortAddress,
        config: SchedulerConfig,
        transport: Arc<dyn PacketTransport>,
        target: SocketAddr,
    ) -> Result<Self> {
        let snapshot: SharedSnapshot = Arc::new(RwLock::new(UniverseSnapshot {
            address,
            ..Default::default()
        }));

        let transmitter = ArtDmxTransmitter {
            address,
            physical: 0,
            sequence: SequenceCounter::new(),
            transport,
            target,
            snapshot: snapshot.clone(),
        };
        let transmit = SchedulerHandle::start(
            format!("artnet-tx-{}", address),
            TransmitScheduler::new(config, transmitter),
        )?;

        let (ingress_tx, ingress_rx) = rendezvous();
        let (output_tx, output_rx) = rendezvous();
        let (stop_tx, stop_rx) = rendezvous();
        let worker_snapshot = snapshot.clone();
        let ingress_worker = thread::Builder::new()
            .name(format!("artnet-rx-{}", address))
            .spawn(move || run_ingress(ingress_rx, output_tx, stop_rx, worker_snapshot))
            .map_err(CoreError::WorkerSpawn)?;

        debug!("Universe {} started, sending to {}", address, target);

        Ok(Self {
            address,
            ingress: ingress_tx,
            output: output_rx,
            output_claimed: Arc::new(AtomicBool::new(false)),
            transmit: Mutex::new(transmit),
            ingress_stop: Mutex::new(Some(stop_tx)),
            ingress_worker: Mutex::new(Some(ingress_worker)),
            snapshot,
        })
    }

    pub fn address(&self) -> PortAddress {
        self.address
    }

    /// Hand a received packet to the ingress worker.
    ///
    /// Returns false if the universe has been shut down.
    pub fn deliver(&self, packet: ArtDmx) -> bool {
        self.ingress.send(packet).is_ok()
    }

    /// Input port: frames sent here are transmitted on the network
    pub fn input(&self) -> Sender<DmxFrame> {
        self.transmit.lock().frames()
    }

    /// Claim the output port; only one consumer may hold it at a time
    pub fn claim_output(&self) -> Result<ClaimedOutput> {
        let claim = self.claim()?;
        Ok(ClaimedOutput {
            frames: self.output.clone(),
            _claim: claim,
        })
    }

    fn claim(&self) -> lightwire_core::Result<PortClaim> {
        PortClaim::acquire(&self.output_claimed).ok_or_else(|| {
            CoreError::DuplicateRegistration(format!("output of universe {}", self.address))
        })
    }

    pub fn is_output_claimed(&self) -> bool {
        self.output_claimed.load(Ordering::Acquire)
    }

    /// Physical port stamped on packets sent from now on
    pub fn set_local_physical(&self, physical: u8) -> bool {
        self.transmit
            .lock()
            .command(TransmitCommand::SetPhysical(physical))
    }

    /// Stop keepalive resends; fresh frames are still sent
    pub fn pause(&self) -> bool {
        let sent = self.transmit.lock().command(TransmitCommand::Pause);
        if sent {
            self.snapshot.write().paused = true;
        }
        sent
    }

    pub fn resume(&self) -> bool {
        let sent = self.transmit.lock().command(TransmitCommand::Resume);
        if sent {
            self.snapshot.write().paused = false;
        }
        sent
    }

    pub fn local_physical(&self) -> u8 {
        self.snapshot.read().local_physical
    }

    pub fn remote_physical(&self) -> u8 {
        self.snapshot.read().remote_physical
    }

    pub fn last_frame(&self) -> Option<DmxFrame> {
        self.snapshot.read().last_frame.clone()
    }

    pub fn sequence(&self) -> u8 {
        self.snapshot.read().sequence
    }

    /// Copy of the diagnostics counters
    pub fn snapshot(&self) -> UniverseSnapshot {
        self.snapshot.read().clone()
    }

    /// Stop both workers. Later deliveries and commands fail.
    pub fn shutdown(&self) {
        self.ingress_stop.lock().take();
        if let Some(worker) = self.ingress_worker.lock().take() {
            let _ = worker.join();
        }
        self.transmit.lock().stop();
        debug!("Universe {} stopped", self.address);
    }
}

impl Drop for Universe {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl FrameSource for Universe {
    fn label(&self) -> String {
        format!("artnet {}", self.address)
    }

    fn output_kind(&self) -> ValueKind {
        ValueKind::Frame
    }

    fn output(&self) -> lightwire_core::Result<OutputHandle> {
        let claim = self.claim()?;
        Ok(OutputHandle::frame(self.output.clone()).with_claim(claim))
    }
}

impl FrameSink for Universe {
    fn label(&self) -> String {
        format!("artnet {}", self.address)
    }

    fn input_kind(&self) -> ValueKind {
        ValueKind::Frame
    }

    fn input(&self) -> lightwire_core::Result<InputHandle> {
        Ok(InputHandle::Frame(Universe::input(self)))
    }
}

fn run_ingress(
    packets: Receiver<ArtDmx>,
    output: Sender<DmxFrame>,
    stop: Receiver<()>,
    snapshot: SharedSnapshot,
) {
    let accept = |packet: ArtDmx, superseded: bool| -> DmxFrame {
        let mut snapshot = snapshot.write();
        snapshot.remote_physical = packet.physical;
        snapshot.frames_received += 1;
        if superseded {
            snapshot.frames_superseded += 1;
        }
        packet.frame
    };

    let mut pending: Option<DmxFrame> = None;

    loop {
        match pending.take() {
            Some(frame) => {
                select! {
                    recv(packets) -> msg => match msg {
                        Ok(packet) => pending = Some(accept(packet, true)),
                        Err(_) => break,
                    },
                    send(output, frame) -> res => {
                        if res.is_ok() {
                            snapshot.write().frames_forwarded += 1;
                        }
                    },
                    recv(stop) -> _ => break,
                }
            }
            None => {
                select! {
                    recv(packets) -> msg => match msg {
                        Ok(packet) => pending = Some(accept(packet, false)),
                        Err(_) => break,
                    },
                    recv(stop) -> _ => break,
                }
            }
        }
    }

    trace!("Ingress worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::parse_header;
    use crate::transport::testing::RecordingTransport;
    use lightwire_core::Patchbay;
    use std::time::Duration;

    fn target() -> SocketAddr {
        "10.255.255.255:6465".parse().unwrap()
    }

    fn universe(transport: Arc<RecordingTransport>) -> Universe {
        Universe::new(
            PortAddress::new(0, 0, 1),
            SchedulerConfig::default(),
            transport,
            target(),
        )
        .unwrap()
    }

    fn packet(physical: u8, data: &[u8]) -> ArtDmx {
        ArtDmx {
            sequence: 1,
            physical,
            address: PortAddress::new(0, 0, 1),
            frame: DmxFrame::from_slice(data).unwrap(),
        }
    }

    fn decode(bytes: &[u8]) -> ArtDmx {
        let (_, body) = parse_header(bytes).unwrap();
        ArtDmx::decode(body).unwrap()
    }

    #[test]
    fn test_ingress_forwards_to_output() {
        let universe = universe(Arc::new(RecordingTransport::default()));
        let output = universe.claim_output().unwrap();

        assert!(universe.deliver(packet(4, &[1, 2, 3])));
        let frame = output.recv_timeout(Duration::from_secs(1)).unwrap();

        assert_eq!(frame.as_slice(), &[1, 2, 3]);
        assert_eq!(universe.remote_physical(), 4);

        let snapshot = universe.snapshot();
        assert_eq!(snapshot.frames_received, 1);
        assert_eq!(snapshot.frames_forwarded, 1);
    }

    #[test]
    fn test_ingress_never_blocks_without_consumer() {
        let universe = universe(Arc::new(RecordingTransport::default()));

        for i in 0..10u8 {
            assert!(universe.deliver(packet(0, &[i])));
        }

        let output = universe.claim_output().unwrap();
        let frame = output.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(frame.as_slice(), &[9]);
        assert_eq!(universe.snapshot().frames_superseded, 9);
    }

    #[test]
    fn test_output_claimed_once() {
        let universe = universe(Arc::new(RecordingTransport::default()));
        let first = universe.claim_output().unwrap();

        let second = universe.claim_output();
        assert!(matches!(
            second,
            Err(ArtNetError::Core(CoreError::DuplicateRegistration(_)))
        ));
        assert!(universe.is_output_claimed());

        drop(first);
        assert!(!universe.is_output_claimed());
        assert!(universe.claim_output().is_ok());
    }

    #[test]
    fn test_input_transmits_artdmx() {
        let transport = Arc::new(RecordingTransport::default());
        let universe = universe(transport.clone());

        assert!(universe.set_local_physical(2));
        universe
            .input()
            .send(DmxFrame::from_slice(&[10, 20]).unwrap())
            .unwrap();
        thread::sleep(Duration::from_millis(20));

        let sent = transport.sent.lock().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, target());

        let packet = decode(&sent[0].0);
        assert_eq!(packet.sequence, 1);
        assert_eq!(packet.physical, 2);
        assert_eq!(packet.address, PortAddress::new(0, 0, 1));
        assert_eq!(packet.frame.as_slice(), &[10, 20]);

        assert_eq!(universe.sequence(), 1);
        assert_eq!(universe.local_physical(), 2);
        assert_eq!(universe.last_frame(), Some(packet.frame));
        assert_eq!(universe.snapshot().packets_sent, 1);
    }

    #[test]
    fn test_send_failure_is_counted() {
        let transport = Arc::new(RecordingTransport::default());
        *transport.fail.lock() = true;
        let universe = universe(transport);

        universe.input().send(DmxFrame::blackout()).unwrap();
        thread::sleep(Duration::from_millis(20));

        let snapshot = universe.snapshot();
        assert_eq!(snapshot.send_failures, 1);
        assert_eq!(snapshot.packets_sent, 0);
    }

    #[test]
    fn test_pause_and_resume_update_snapshot() {
        let universe = universe(Arc::new(RecordingTransport::default()));
        assert!(universe.pause());
        assert!(universe.snapshot().paused);
        assert!(universe.resume());
        assert!(!universe.snapshot().paused);
    }

    #[test]
    fn test_shutdown_stops_workers() {
        let universe = universe(Arc::new(RecordingTransport::default()));
        universe.shutdown();

        assert!(!universe.deliver(packet(0, &[1])));
        assert!(!universe.pause());
        assert!(universe.input().send(DmxFrame::blackout()).is_err());
    }

    #[test]
    fn test_universe_is_frame_source_and_sink() {
        let universe = universe(Arc::new(RecordingTransport::default()));
        assert_eq!(FrameSource::output_kind(&universe), ValueKind::Frame);
        assert_eq!(FrameSink::input_kind(&universe), ValueKind::Frame);

        let output = FrameSource::output(&universe).unwrap();
        assert!(output.is_claimed());
        assert!(matches!(
            FrameSource::output(&universe),
            Err(CoreError::DuplicateRegistration(_))
        ));
    }

    #[test]
    fn test_universe_repatched_after_unpatch() {
        let transport = Arc::new(RecordingTransport::default());
        let source = universe(transport.clone());
        let sink = Universe::new(
            PortAddress::new(0, 0, 2),
            SchedulerConfig::default(),
            transport.clone(),
            target(),
        )
        .unwrap();
        let bay = Patchbay::new();

        let id = bay.patch(&source, &sink).unwrap();
        assert!(source.is_output_claimed());
        assert!(matches!(
            source.claim_output(),
            Err(ArtNetError::Core(CoreError::DuplicateRegistration(_)))
        ));

        assert!(bay.unpatch(id));
        assert!(!source.is_output_claimed());

        bay.patch(&source, &sink).unwrap();
        assert!(source.deliver(packet(0, &[42])));
        thread::sleep(Duration::from_millis(50));

        let sent = transport.sent.lock().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(decode(&sent[0].0).frame.as_slice(), &[42]);
    }
}
