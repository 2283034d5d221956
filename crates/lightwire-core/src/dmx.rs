//! DMX512 value types
//!
//! A [`DmxFrame`] is the ordered list of channel levels carried by one
//! universe, at most [`UNIVERSE_SIZE`] values long. Channel numbers are
//! 1-based everywhere in this crate, matching how lighting desks label them.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};

/// Number of channels in a DMX512 universe
pub const UNIVERSE_SIZE: usize = 512;

/// A single channel level
pub type DmxValue = u8;

/// Channel levels for one universe
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DmxFrame(Vec<DmxValue>);

impl DmxFrame {
    /// Build a frame from raw levels, rejecting anything longer than a universe
    pub fn new(values: Vec<DmxValue>) -> Result<Self> {
        if values.len() > UNIVERSE_SIZE {
            return Err(CoreError::FrameTooLong(values.len()));
        }
        Ok(Self(values))
    }

    /// Copy levels from a slice
    pub fn from_slice(values: &[DmxValue]) -> Result<Self> {
        Self::new(values.to_vec())
    }

    /// A full universe with every channel at zero
    pub fn blackout() -> Self {
        Self(vec![0; UNIVERSE_SIZE])
    }

    /// Number of channels carried
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[DmxValue] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<DmxValue> {
        self.0
    }

    /// Level of a 1-based channel, `None` if the frame is shorter
    pub fn get(&self, channel: usize) -> Option<DmxValue> {
        if channel == 0 {
            return None;
        }
        self.0.get(channel - 1).copied()
    }

    /// Set a 1-based channel, growing the frame with zeros when needed
    pub fn set(&mut self, channel: usize, value: DmxValue) -> Result<()> {
        if channel == 0 || channel > UNIVERSE_SIZE {
            return Err(CoreError::InvalidChannel(channel));
        }
        if self.0.len() < channel {
            self.0.resize(channel, 0);
        }
        self.0[channel - 1] = value;
        Ok(())
    }

    /// Per-channel maximum of two frames; the result is as long as the longer one
    pub fn highest(&self, other: &DmxFrame) -> DmxFrame {
        let len = self.len().max(other.len());
        let values = (0..len)
            .map(|i| {
                let a = self.0.get(i).copied().unwrap_or(0);
                let b = other.0.get(i).copied().unwrap_or(0);
                a.max(b)
            })
            .collect();
        DmxFrame(values)
    }
}

impl TryFrom<Vec<DmxValue>> for DmxFrame {
    type Error = CoreError;

    fn try_from(values: Vec<DmxValue>) -> Result<Self> {
        Self::new(values)
    }
}

impl AsRef<[DmxValue]> for DmxFrame {
    fn as_ref(&self) -> &[DmxValue] {
        &self.0
    }
}

impl fmt::Display for DmxFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<DMX frame {} ch>", self.0.len())
    }
}
