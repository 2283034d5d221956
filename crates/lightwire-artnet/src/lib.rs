//! Lightwire Art-Net - DMX512 over UDP
//!
//! This crate connects Lightwire universes to an Art-Net network:
//! - **Codec**: header, ArtDmx and ArtPoll encoding/decoding ([`protocol`])
//! - **Dispatch**: routing of received datagrams by opcode ([`dispatch`])
//! - **Universes**: one entity per Port-Address with ingress and transmit
//!   workers, created on demand by the [`UniverseRegistry`]
//! - **Scheduling**: rate-limited sending with keepalive resends ([`scheduler`])
//! - **Node**: tokio UDP sockets and configuration ([`ArtNetNode`], [`NodeConfig`])
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lightwire_artnet::{ArtNetNode, NodeConfig, PortAddress};
//! use lightwire_core::DmxFrame;
//!
//! # async fn example() -> lightwire_artnet::Result<()> {
//! let node = ArtNetNode::bind(&NodeConfig::default())?;
//! let universe = node.registry().get_or_create(PortAddress::new(0, 0, 1))?;
//!
//! let mut frame = DmxFrame::blackout();
//! frame.set(1, 255)?;
//! let _ = universe.input().send(frame);
//!
//! node.run(async {
//!     let _ = tokio::signal::ctrl_c().await;
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

#![allow(missing_docs)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod node;
pub mod protocol;
pub mod registry;
pub mod scheduler;
pub mod transport;
pub mod universe;

pub use config::{NodeConfig, SchedulerSettings, UniverseConfig};
pub use dispatch::{handle_packet, handler_for, Handler};
pub use error::{ArtNetError, Result};
pub use node::{ArtNetNode, NodeStats};
pub use protocol::{ArtDmx, ArtPoll, OpCode, PortAddress, SequenceCounter};
pub use registry::UniverseRegistry;
pub use scheduler::{SchedulerConfig, TransmitCommand};
pub use transport::PacketTransport;
pub use universe::{ClaimedOutput, Universe, UniverseSnapshot};
