//! Error types for the core value plumbing
use thiserror::Error;

/// Core errors
#[derive(Error, Debug)]
pub enum CoreError {
    /// Something was registered twice under the same key
    #[error("Duplicate registration: {0}")]
    DuplicateRegistration(String),

    /// Two ports carry values of different kinds
    #[error("Incompatible endpoints: cannot patch {output} into {input}")]
    IncompatibleEndpoint {
        /// Label of the output side
        output: String,
        /// Label of the input side
        input: String,
    },

    /// DMX channel number outside 1-512
    #[error("Invalid DMX channel: {0} (must be 1-512)")]
    InvalidChannel(usize),

    /// Frame longer than a universe
    #[error("Frame too long: {0} values (max 512)")]
    FrameTooLong(usize),

    /// A worker thread could not be started
    #[error("Failed to spawn worker: {0}")]
    WorkerSpawn(#[from] std::io::Error),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
