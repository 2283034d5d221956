//! Universe registry
//!
//! Universes are created the first time their address is looked up and then
//! live as long as the registry. Creation happens under a single lock, so two
//! concurrent first lookups for the same address get the same entity.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use crate::error::Result;
use crate::protocol::PortAddress;
use crate::scheduler::SchedulerConfig;
use crate::transport::PacketTransport;
use crate::universe::{ClaimedOutput, Universe, UniverseSnapshot};

/// Address-keyed table of universes sharing one transport
pub struct UniverseRegistry {
    universes: Mutex<HashMap<u16, Arc<Universe>>>,
    transport: Arc<dyn PacketTransport>,
    target: SocketAddr,
    config: SchedulerConfig,
}

impl UniverseRegistry {
    /// Create an empty registry; new universes send through `transport` to `target`
    pub fn new(
        transport: Arc<dyn PacketTransport>,
        target: SocketAddr,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            universes: Mutex::new(HashMap::new()),
            transport,
            target,
            config,
        }
    }

    /// Look up the universe for `address`, creating it on first use
    pub fn get_or_create(&self, address: PortAddress) -> Result<Arc<Universe>> {
        let key = address.encode();
        let mut universes = self.universes.lock();

        if let Some(universe) = universes.get(&key) {
            return Ok(universe.clone());
        }

        // Masked fields so the entity's address matches its key
        let universe = Arc::new(Universe::new(
            address.normalized(),
            self.config,
            self.transport.clone(),
            self.target,
        )?);
        universes.insert(key, universe.clone());
        info!("Created universe {} ({:#06x})", universe.address(), key);

        Ok(universe)
    }

    /// Look up an existing universe without creating it
    pub fn get(&self, address: PortAddress) -> Option<Arc<Universe>> {
        self.universes.lock().get(&address.encode()).cloned()
    }

    /// Claim the output port of the universe at `address`.
    ///
    /// A second claim for the same address fails with
    /// [`CoreError::DuplicateRegistration`](lightwire_core::CoreError).
    pub fn claim_output(&self, address: PortAddress) -> Result<ClaimedOutput> {
        self.get_or_create(address)?.claim_output()
    }

    pub fn len(&self) -> usize {
        self.universes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.universes.lock().is_empty()
    }

    /// Addresses of all universes, sorted by encoded value
    pub fn addresses(&self) -> Vec<PortAddress> {
        let mut keys: Vec<u16> = self.universes.lock().keys().copied().collect();
        keys.sort_unstable();
        keys.into_iter().map(PortAddress::decode).collect()
    }

    /// Diagnostics for every universe, sorted by address
    pub fn snapshots(&self) -> Vec<UniverseSnapshot> {
        let universes: Vec<Arc<Universe>> = self.universes.lock().values().cloned().collect();
        let mut snapshots: Vec<UniverseSnapshot> =
            universes.iter().map(|u| u.snapshot()).collect();
        snapshots.sort_by_key(|s| s.address.encode());
        snapshots
    }

    /// Stop the workers of every universe; entries stay registered
    pub fn shutdown(&self) {
        let universes: Vec<Arc<Universe>> = self.universes.lock().values().cloned().collect();
        for universe in universes {
            universe.shutdown();
        }
    }
}
