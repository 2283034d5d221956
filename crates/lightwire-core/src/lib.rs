//! Lightwire Core - DMX values, typed ports and value merging
//!
//! This crate contains the protocol-independent half of Lightwire:
//! - DMX512 frame and level types
//! - Typed ports ([`FrameSource`], [`FrameSink`]) and a [`Patchbay`] to wire them
//! - A latest-value [`mailbox`] between rendezvous channels
//! - Value merging of concurrent producers ([`merge`])
//! - A buffered universe with per-channel inputs ([`DmxUniverse`])
//! - Logging configuration shared by the binaries

#![allow(missing_docs)]

pub mod buffer;
pub mod dmx;
pub mod error;
pub mod logging;
pub mod mailbox;
pub mod merge;
pub mod patch;
pub mod port;

pub use buffer::{DmxChannel, DmxUniverse};
pub use dmx::{DmxFrame, DmxValue, UNIVERSE_SIZE};
pub use error::{CoreError, Result};
pub use logging::LogConfig;
pub use merge::{
    HighestTakesPrecedence, HtpFrames, LatestTakesPrecedence, MergeChain, Priority, PriorityMap,
    Selector, ValueSlot, ValueSource,
};
pub use patch::{PatchId, Patchbay};
pub use port::{
    FrameSink, FrameSource, InputHandle, OutputHandle, OutputPort, PortClaim, ValueKind,
};
