//! Rate-limited keepalive transmit scheduler
//!
//! Frames written to a universe pass through a [`TransmitScheduler`] before
//! they reach the wire. The scheduler:
//!
//! - sends a fresh frame immediately unless one was sent less than
//!   `rate_limit` ago, in which case only the latest frame is kept and sent
//!   when the window closes
//! - resends the last frame after `keepalive` without any new frame
//! - stops resending while paused
//!
//! The worker waits on the frame channel, its control channel and up to two
//! timers, so it never polls. Dropping the control sender stops it.

use crossbeam_channel::{at, never, select, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use lightwire_core::{CoreError, DmxFrame};

/// Default suppression window between two sends
pub const DEFAULT_RATE_LIMIT: Duration = Duration::from_millis(25);
/// Default keepalive interval
pub const DEFAULT_KEEPALIVE: Duration = Duration::from_secs(4 * 60);

/// Timing parameters of a scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub rate_limit: Duration,
    pub keepalive: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            rate_limit: DEFAULT_RATE_LIMIT,
            keepalive: DEFAULT_KEEPALIVE,
        }
    }
}

/// Why a frame is being transmitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmitReason {
    /// A new frame from the input port
    Fresh,
    /// The last frame again after a quiet keepalive interval
    Keepalive,
}

/// Puts frames on the wire on behalf of a scheduler
pub trait FrameTransmitter: Send {
    fn transmit(&mut self, frame: &DmxFrame, reason: TransmitReason);

    /// Change the physical port stamped on later packets
    fn set_physical(&mut self, _physical: u8) {}
}

/// Control messages for a running scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmitCommand {
    Pause,
    Resume,
    SetPhysical(u8),
}

/// Observable scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Nothing sent yet, or the suppression window has closed
    Idle,
    /// Suppression window open; keepalive running
    Armed,
    /// Keepalive suppressed until resumed
    Paused,
}

/// Coalescing transmit loop for one stream of frames
pub struct TransmitScheduler<X: FrameTransmitter> {
    config: SchedulerConfig,
    transmitter: X,
    pending: Option<DmxFrame>,
    last: Option<DmxFrame>,
    suppress_until: Option<Instant>,
    keepalive_at: Option<Instant>,
    paused: bool,
}

impl<X: FrameTransmitter> TransmitScheduler<X> {
    pub fn new(config: SchedulerConfig, transmitter: X) -> Self {
        Self {
            config,
            transmitter,
            pending: None,
            last: None,
            suppress_until: None,
            keepalive_at: None,
            paused: false,
        }
    }

    pub fn state(&self) -> SchedulerState {
        if self.paused {
            SchedulerState::Paused
        } else if self.suppress_until.is_some() {
            SchedulerState::Armed
        } else {
            SchedulerState::Idle
        }
    }

    /// Spawn the scheduler on a named worker thread
    pub fn spawn(
        self,
        name: String,
        frames: Receiver<DmxFrame>,
        control: Receiver<TransmitCommand>,
    ) -> Result<JoinHandle<()>, CoreError>
    where
        X: 'static,
    {
        thread::Builder::new()
            .name(name)
            .spawn(move || self.run(frames, control))
            .map_err(CoreError::WorkerSpawn)
    }

    /// Run until the control channel disconnects
    pub fn run(mut self, frames: Receiver<DmxFrame>, control: Receiver<TransmitCommand>) {
        let idle = never();
        let mut frames_open = true;

        loop {
            let frame_rx = if frames_open { &frames } else { &idle };
            let suppress = self.suppress_until.map(at).unwrap_or_else(never);
            let keepalive = match (self.paused, self.keepalive_at) {
                (false, Some(deadline)) => at(deadline),
                _ => never(),
            };

            select! {
                recv(frame_rx) -> msg => match msg {
                    Ok(frame) => self.on_frame(frame, Instant::now()),
                    // No more producers; keep serving keepalives
                    Err(_) => frames_open = false,
                },
                recv(control) -> msg => match msg {
                    Ok(command) => self.on_command(command, Instant::now()),
                    Err(_) => break,
                },
                recv(suppress) -> _ => self.on_window_closed(Instant::now()),
                recv(keepalive) -> _ => self.on_keepalive(Instant::now()),
            }
        }

        debug!("Transmit scheduler stopped");
    }

    fn on_frame(&mut self, frame: DmxFrame, now: Instant) {
        if self.suppress_until.is_some() {
            trace!("Coalescing frame inside suppression window");
            self.pending = Some(frame);
            return;
        }
        self.send(frame, TransmitReason::Fresh, now);
    }

    fn on_window_closed(&mut self, now: Instant) {
        match self.pending.take() {
            Some(frame) => self.send(frame, TransmitReason::Fresh, now),
            None => self.suppress_until = None,
        }
    }

    fn on_keepalive(&mut self, now: Instant) {
        if self.pending.is_some() {
            // Sending the pending frame when the window closes re-arms the timer
            self.keepalive_at = None;
            return;
        }
        if let Some(frame) = self.last.take() {
            self.transmitter.transmit(&frame, TransmitReason::Keepalive);
            self.last = Some(frame);
        }
        self.keepalive_at = Some(now + self.config.keepalive);
    }

    fn on_command(&mut self, command: TransmitCommand, now: Instant) {
        match command {
            TransmitCommand::Pause => {
                debug!("Transmit paused");
                self.paused = true;
                self.keepalive_at = None;
            }
            TransmitCommand::Resume => {
                debug!("Transmit resumed");
                self.paused = false;
                if self.last.is_some() {
                    self.keepalive_at = Some(now + self.config.keepalive);
                }
            }
            TransmitCommand::SetPhysical(physical) => self.transmitter.set_physical(physical),
        }
    }

    fn send(&mut self, frame: DmxFrame, reason: TransmitReason, now: Instant) {
        self.transmitter.transmit(&frame, reason);
        self.last = Some(frame);
        self.suppress_until = Some(now + self.config.rate_limit);
        if !self.paused {
            self.keepalive_at = Some(now + self.config.keepalive);
        }
    }
}

/// Handle to a scheduler running on its own thread
pub struct SchedulerHandle {
    frames: Sender<DmxFrame>,
    control: Option<Sender<TransmitCommand>>,
    worker: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Spawn `scheduler` and keep the sending ends of its channels
    pub fn start<X: FrameTransmitter + 'static>(
        name: String,
        scheduler: TransmitScheduler<X>,
    ) -> Result<Self, CoreError> {
        let (frames, frame_rx) = lightwire_core::port::rendezvous();
        let (control, control_rx) = lightwire_core::port::rendezvous();
        let worker = scheduler.spawn(name, frame_rx, control_rx)?;

        Ok(Self {
            frames,
            control: Some(control),
            worker: Some(worker),
        })
    }

    /// Sending end of the frame channel
    pub fn frames(&self) -> Sender<DmxFrame> {
        self.frames.clone()
    }

    /// Deliver a command; returns false once stopped
    pub fn command(&self, command: TransmitCommand) -> bool {
        match &self.control {
            Some(control) => control.send(command).is_ok(),
            None => false,
        }
    }

    /// Stop the worker and wait for it
    pub fn stop(&mut self) {
        self.control.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
