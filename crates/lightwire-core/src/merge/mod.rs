//! Value merging
//!
//! Lighting values rarely have a single author: a console, an effect engine
//! and a fixture macro may all drive the same universe at once. This module
//! resolves them into one current value.
//!
//! - [`MergeChain`]: producers ordered by registration, resolved by a
//!   [`Selector`] such as [`LatestTakesPrecedence`] or [`HtpFrames`]
//! - [`PriorityMap`]: sources keyed by an explicit [`Priority`] with a default
//!
//! ## Example
//!
//! ```rust
//! use lightwire_core::merge::{LatestTakesPrecedence, MergeChain};
//! use std::time::Duration;
//!
//! # fn main() -> lightwire_core::Result<()> {
//! let chain = MergeChain::<u8>::new("dimmer", LatestTakesPrecedence)?;
//! let merged = chain.output();
//!
//! let (_console, console) = chain.open_input()?;
//! console.send(255).unwrap();
//! assert_eq!(merged.recv_timeout(Duration::from_secs(1)), Ok(255));
//! # Ok(())
//! # }
//! ```

pub mod chain;
pub mod priority;
pub mod selector;

pub use chain::{InputId, MergeChain};
pub use priority::{Priority, PriorityMap, ValueSlot, ValueSource};
pub use selector::{HighestTakesPrecedence, HtpFrames, LatestTakesPrecedence, Selector};
