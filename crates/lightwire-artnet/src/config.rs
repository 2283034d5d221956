//! Node configuration
//!
//! Loaded from TOML. Every field has a default, so an empty file (or no file
//! at all) yields a working node on the standard port.
//!
//! ```toml
//! port = 6465
//! broadcast_address = "2.255.255.255"
//!
//! [scheduler]
//! rate_limit_ms = 25
//! keepalive_secs = 240
//!
//! [[universes]]
//! network = 0
//! subnet = 0
//! universe = 1
//! physical = 0
//! ```

use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::Path;
use std::time::Duration;

use lightwire_core::LogConfig;

use crate::error::{ArtNetError, Result};
use crate::protocol::PortAddress;
use crate::scheduler::SchedulerConfig;

/// Default Art-Net UDP port used by this node
pub const DEFAULT_PORT: u16 = 6465;

/// Primary Art-Net broadcast network
pub const PRIMARY_BROADCAST: Ipv4Addr = Ipv4Addr::new(2, 255, 255, 255);

/// Secondary Art-Net broadcast network
pub const SECONDARY_BROADCAST: Ipv4Addr = Ipv4Addr::new(10, 255, 255, 255);

/// Largest config file accepted
pub const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Transmit timing in config units
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SchedulerSettings {
    pub rate_limit_ms: u64,
    pub keepalive_secs: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            rate_limit_ms: 25,
            keepalive_secs: 240,
        }
    }
}

impl From<SchedulerSettings> for SchedulerConfig {
    fn from(settings: SchedulerSettings) -> Self {
        SchedulerConfig {
            rate_limit: Duration::from_millis(settings.rate_limit_ms),
            keepalive: Duration::from_secs(settings.keepalive_secs),
        }
    }
}

/// A universe created at startup
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UniverseConfig {
    pub network: u8,
    pub subnet: u8,
    pub universe: u8,
    /// Physical port stamped on outgoing packets
    pub physical: u8,
}

impl UniverseConfig {
    pub fn address(&self) -> PortAddress {
        PortAddress::new(self.network, self.subnet, self.universe)
    }
}

/// Complete node configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NodeConfig {
    /// UDP port for both directions
    pub port: u16,
    /// Destination of outgoing packets
    pub broadcast_address: Ipv4Addr,
    /// Local address for the receive socket
    pub bind_address: Ipv4Addr,
    /// Also receive on a socket bound to the broadcast address
    pub listen_broadcast: bool,
    /// Receive buffer per datagram in bytes
    pub recv_buffer_size: usize,
    pub scheduler: SchedulerSettings,
    pub universes: Vec<UniverseConfig>,
    pub logging: LogConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            broadcast_address: PRIMARY_BROADCAST,
            bind_address: Ipv4Addr::UNSPECIFIED,
            listen_broadcast: false,
            recv_buffer_size: 4096,
            scheduler: SchedulerSettings::default(),
            universes: Vec::new(),
            logging: LogConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Load and validate a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let size = std::fs::metadata(path)?.len();
        if size > MAX_CONFIG_FILE_SIZE {
            return Err(ArtNetError::Config(format!(
                "{} is {} bytes (max {})",
                path.display(),
                size,
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: NodeConfig =
            toml::from_str(content).map_err(|e| ArtNetError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ArtNetError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.scheduler.rate_limit_ms == 0 {
            return Err(ArtNetError::Config(
                "scheduler.rate_limit_ms must be greater than 0".to_string(),
            ));
        }
        let keepalive_ms = self.scheduler.keepalive_secs.saturating_mul(1000);
        if keepalive_ms < self.scheduler.rate_limit_ms {
            return Err(ArtNetError::Config(format!(
                "scheduler.keepalive_secs ({}s) is shorter than the rate limit ({}ms)",
                self.scheduler.keepalive_secs, self.scheduler.rate_limit_ms
            )));
        }
        if self.recv_buffer_size == 0 {
            return Err(ArtNetError::Config(
                "recv_buffer_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        self.scheduler.into()
    }

    /// Where outgoing packets are sent
    pub fn target(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.broadcast_address, self.port))
    }

    /// Address of the local receive socket
    pub fn bind(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.bind_address, self.port))
    }

    /// Address of the broadcast receive socket
    pub fn broadcast_bind(&self) -> SocketAddr {
        self.target()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = NodeConfig::default();
        assert_eq!(config.port, 6465);
        assert_eq!(config.target(), "2.255.255.255:6465".parse().unwrap());
        assert_eq!(config.bind(), "0.0.0.0:6465".parse().unwrap());
        assert_eq!(config.scheduler_config(), SchedulerConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(NodeConfig::from_toml_str("").unwrap(), NodeConfig::default());
    }

    #[test]
    fn test_parse_full_document() {
        let config = NodeConfig::from_toml_str(
            r#"
            port = 6454
            broadcast_address = "10.255.255.255"
            listen_broadcast = true

            [scheduler]
            rate_limit_ms = 40

            [[universes]]
            subnet = 1
            universe = 2
            physical = 3

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 6454);
        assert_eq!(config.broadcast_address, SECONDARY_BROADCAST);
        assert!(config.listen_broadcast);
        assert_eq!(config.scheduler.rate_limit_ms, 40);
        assert_eq!(config.scheduler.keepalive_secs, 240);
        assert_eq!(config.universes.len(), 1);
        assert_eq!(config.universes[0].address(), PortAddress::new(0, 1, 2));
        assert_eq!(config.universes[0].physical, 3);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_validation_rejects_bad_timing() {
        let mut config = NodeConfig::default();
        config.scheduler.rate_limit_ms = 0;
        assert!(matches!(config.validate(), Err(ArtNetError::Config(_))));

        let mut config = NodeConfig::default();
        config.scheduler.rate_limit_ms = 5000;
        config.scheduler.keepalive_secs = 1;
        assert!(config.validate().is_err());

        let mut config = NodeConfig::default();
        config.recv_buffer_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = NodeConfig::from_toml_str("port = \"not a number\"");
        assert!(matches!(result, Err(ArtNetError::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = 7000").unwrap();

        let config = NodeConfig::load(file.path()).unwrap();
        assert_eq!(config.port, 7000);
    }

    #[test]
    fn test_save_and_reload() {
        let mut config = NodeConfig::default();
        config.universes.push(UniverseConfig {
            network: 1,
            ..Default::default()
        });

        let text = config.to_toml_string().unwrap();
        assert_eq!(NodeConfig::from_toml_str(&text).unwrap(), config);
    }
}
