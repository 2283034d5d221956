//! Typed ports exchanged between lighting components
//!
//! Components that produce values implement [`FrameSource`], components that
//! consume them implement [`FrameSink`]. Each side declares the kind of value
//! it carries up front so a patch can be validated before anything is wired.

use crossbeam_channel::{bounded, Receiver, Sender};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::dmx::{DmxFrame, DmxValue};
use crate::error::Result;

/// Kind of value carried by a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Whole universe frames
    Frame,
    /// A single channel level
    Level,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Frame => write!(f, "frame"),
            ValueKind::Level => write!(f, "level"),
        }
    }
}

/// Exclusive hold on a port, released when dropped
#[derive(Debug)]
pub struct PortClaim {
    flag: Arc<AtomicBool>,
}

impl PortClaim {
    /// Take the claim guarded by `flag`, or `None` while someone else holds it
    pub fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag: flag.clone() })
    }
}

impl Drop for PortClaim {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Receiver of a source's output port
#[derive(Debug)]
pub enum OutputPort {
    Frame(Receiver<DmxFrame>),
    Level(Receiver<DmxValue>),
}

impl OutputPort {
    pub fn kind(&self) -> ValueKind {
        match self {
            OutputPort::Frame(_) => ValueKind::Frame,
            OutputPort::Level(_) => ValueKind::Level,
        }
    }
}

/// Receiving end of a source's output port.
///
/// Sources with a single consumer attach a [`PortClaim`]; whoever ends up
/// holding the receiver keeps the claim alive for as long as it reads.
#[derive(Debug)]
pub struct OutputHandle {
    port: OutputPort,
    claim: Option<PortClaim>,
}

impl OutputHandle {
    pub fn frame(rx: Receiver<DmxFrame>) -> Self {
        Self {
            port: OutputPort::Frame(rx),
            claim: None,
        }
    }

    pub fn level(rx: Receiver<DmxValue>) -> Self {
        Self {
            port: OutputPort::Level(rx),
            claim: None,
        }
    }

    /// Attach a claim that is released together with the receiver
    pub fn with_claim(mut self, claim: PortClaim) -> Self {
        self.claim = Some(claim);
        self
    }

    pub fn kind(&self) -> ValueKind {
        self.port.kind()
    }

    pub fn is_claimed(&self) -> bool {
        self.claim.is_some()
    }

    pub fn into_parts(self) -> (OutputPort, Option<PortClaim>) {
        (self.port, self.claim)
    }
}

/// Sending end of a sink's input port
#[derive(Debug, Clone)]
pub enum InputHandle {
    Frame(Sender<DmxFrame>),
    Level(Sender<DmxValue>),
}

impl InputHandle {
    pub fn kind(&self) -> ValueKind {
        match self {
            InputHandle::Frame(_) => ValueKind::Frame,
            InputHandle::Level(_) => ValueKind::Level,
        }
    }
}

/// Something that emits values on an output port
pub trait FrameSource {
    /// Human readable name used in logs and errors
    fn label(&self) -> String;

    /// Kind of value the output carries
    fn output_kind(&self) -> ValueKind;

    /// Obtain the output port
    fn output(&self) -> Result<OutputHandle>;
}

/// Something that accepts values on an input port
pub trait FrameSink {
    /// Human readable name used in logs and errors
    fn label(&self) -> String;

    /// Kind of value the input accepts
    fn input_kind(&self) -> ValueKind;

    /// Obtain the input port
    fn input(&self) -> Result<InputHandle>;
}

/// Unbuffered channel: a send waits for a matching receive
pub fn rendezvous<T>() -> (Sender<T>, Receiver<T>) {
    bounded(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_is_exclusive_until_dropped() {
        let flag = Arc::new(AtomicBool::new(false));

        let claim = PortClaim::acquire(&flag).unwrap();
        assert!(PortClaim::acquire(&flag).is_none());

        drop(claim);
        assert!(PortClaim::acquire(&flag).is_some());
    }

    #[test]
    fn test_handle_carries_claim() {
        let flag = Arc::new(AtomicBool::new(false));
        let (_tx, rx) = rendezvous::<DmxFrame>();

        let handle = OutputHandle::frame(rx).with_claim(PortClaim::acquire(&flag).unwrap());
        assert_eq!(handle.kind(), ValueKind::Frame);
        assert!(handle.is_claimed());

        drop(handle);
        assert!(!flag.load(Ordering::Acquire));
    }
}
