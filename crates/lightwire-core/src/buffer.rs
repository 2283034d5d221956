//! Universe buffer with per-channel inputs
//!
//! [`DmxUniverse`] keeps the current level of all 512 channels and publishes
//! the whole frame every time one of them changes. It is the usual thing to
//! patch into a network universe's input.

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use tracing::{trace, warn};

use crate::dmx::{DmxFrame, DmxValue, UNIVERSE_SIZE};
use crate::error::{CoreError, Result};
use crate::mailbox::spawn_mailbox;
use crate::port::{rendezvous, FrameSink, FrameSource, InputHandle, OutputHandle, ValueKind};

struct BufferInner {
    label: String,
    data: Mutex<DmxFrame>,
    publish: Mutex<Sender<DmxFrame>>,
}

impl BufferInner {
    fn set(&self, channel: usize, value: DmxValue) -> Result<()> {
        let mut data = self.data.lock();
        data.set(channel, value)?;

        // Publish while holding the data lock so frames leave in update order
        if self.publish.lock().send(data.clone()).is_err() {
            warn!("{}: frame publisher is gone", self.label);
        }
        Ok(())
    }
}

/// Buffered DMX universe
pub struct DmxUniverse {
    inner: Arc<BufferInner>,
    output: Receiver<DmxFrame>,
}

impl DmxUniverse {
    /// Create a blacked-out universe
    pub fn new(label: impl Into<String>) -> Result<Self> {
        let label = label.into();
        let (publish_tx, publish_rx) = rendezvous();
        let (out_tx, out_rx) = rendezvous();
        spawn_mailbox(&label, publish_rx, out_tx)?;

        Ok(Self {
            inner: Arc::new(BufferInner {
                label,
                data: Mutex::new(DmxFrame::blackout()),
                publish: Mutex::new(publish_tx),
            }),
            output: out_rx,
        })
    }

    /// Set a 1-based channel and publish the resulting frame
    pub fn set(&self, channel: usize, value: DmxValue) -> Result<()> {
        self.inner.set(channel, value)
    }

    /// Current level of a 1-based channel
    pub fn value(&self, channel: usize) -> Result<DmxValue> {
        if channel == 0 || channel > UNIVERSE_SIZE {
            return Err(CoreError::InvalidChannel(channel));
        }
        Ok(self.inner.data.lock().get(channel).unwrap_or(0))
    }

    /// Snapshot of the whole universe
    pub fn frame(&self) -> DmxFrame {
        self.inner.data.lock().clone()
    }

    /// Handle for a single 1-based channel
    pub fn channel(&self, number: usize) -> Result<DmxChannel> {
        if number == 0 || number > UNIVERSE_SIZE {
            return Err(CoreError::InvalidChannel(number));
        }
        Ok(DmxChannel {
            universe: self.inner.clone(),
            number,
        })
    }

    /// Receiver of published frames
    pub fn frames(&self) -> Receiver<DmxFrame> {
        self.output.clone()
    }
}

impl FrameSource for DmxUniverse {
    fn label(&self) -> String {
        self.inner.label.clone()
    }

    fn output_kind(&self) -> ValueKind {
        ValueKind::Frame
    }

    fn output(&self) -> Result<OutputHandle> {
        Ok(OutputHandle::frame(self.frames()))
    }
}

/// One channel of a [`DmxUniverse`]
#[derive(Clone)]
pub struct DmxChannel {
    universe: Arc<BufferInner>,
    number: usize,
}

impl DmxChannel {
    pub fn number(&self) -> usize {
        self.number
    }

    pub fn set(&self, value: DmxValue) -> Result<()> {
        self.universe.set(self.number, value)
    }

    pub fn value(&self) -> DmxValue {
        self.universe.data.lock().get(self.number).unwrap_or(0)
    }

    /// Open a level input for this channel.
    ///
    /// Each call starts a worker that applies every received level; it exits
    /// once all senders for that input are dropped.
    pub fn open_input(&self) -> Result<Sender<DmxValue>> {
        let (tx, rx) = rendezvous::<DmxValue>();
        let channel = self.clone();
        thread::Builder::new()
            .name(format!("{}-ch{}", self.universe.label, self.number))
            .spawn(move || {
                for value in rx {
                    trace!("{}.{} <- {}", channel.universe.label, channel.number, value);
                    if let Err(e) = channel.set(value) {
                        warn!("Failed to set channel {}: {}", channel.number, e);
                    }
                }
            })?;
        Ok(tx)
    }
}

impl FrameSink for DmxChannel {
    fn label(&self) -> String {
        format!("{}.{}", self.universe.label, self.number)
    }

    fn input_kind(&self) -> ValueKind {
        ValueKind::Level
    }

    fn input(&self) -> Result<InputHandle> {
        Ok(InputHandle::Level(self.open_input()?))
    }
}
