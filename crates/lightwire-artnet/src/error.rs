//! Error types for the Art-Net layer
use lightwire_core::CoreError;
use thiserror::Error;

/// Art-Net errors
#[derive(Error, Debug)]
pub enum ArtNetError {
    /// Identifier or protocol version did not match
    #[error(
        "Malformed header: id valid {id_valid}, opcode {opcode:#06x}, version {version_hi}.{version_lo}"
    )]
    MalformedHeader {
        /// Whether the packet started with `Art-Net\0`
        id_valid: bool,
        /// Opcode as read from the packet (0 if not present)
        opcode: u16,
        /// Protocol version high byte (must be 0)
        version_hi: u8,
        /// Protocol version low byte (must be at least 14)
        version_lo: u8,
    },

    /// No handler for this opcode
    #[error("Handler not found for opcode {0:#06x}")]
    UnknownOpcode(u16),

    /// Fewer bytes than the packet declared
    #[error("Truncated packet: declared {declared} bytes, {available} available")]
    TruncatedPacket {
        /// Length the packet claims
        declared: usize,
        /// Bytes actually present
        available: usize,
    },

    /// Data length above one universe
    #[error("DMX data too long: {0} bytes (max 512)")]
    FrameTooLong(usize),

    /// Transport refused to send
    #[error("Send failed: {0}")]
    SendFailure(#[source] std::io::Error),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Config error: {0}")]
    Config(String),

    /// Error from the core value plumbing
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for Art-Net operations
pub type Result<T> = std::result::Result<T, ArtNetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ArtNetError::UnknownOpcode(0x8300);
        assert_eq!(err.to_string(), "Handler not found for opcode 0x8300");

        let err = ArtNetError::TruncatedPacket {
            declared: 512,
            available: 10,
        };
        assert!(err.to_string().contains("512"));
        assert!(err.to_string().contains("10"));
    }

    #[test]
    fn test_core_error_is_transparent() {
        let err: ArtNetError = CoreError::DuplicateRegistration("x".to_string()).into();
        assert_eq!(err.to_string(), "Duplicate registration: x");
    }
}
