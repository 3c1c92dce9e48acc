//! Error types for mcp-server

use thiserror::Error;

/// Transport and startup failures
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Capability error: {0}")]
    CapabilityError(#[from] capability_core::CapabilityError),
}
