//! Error types for capability-core

use thiserror::Error;

use crate::descriptor::CapabilityKind;

/// Result type alias for registry and dispatch operations
pub type Result<T> = std::result::Result<T, CapabilityError>;

/// Capability error types
#[derive(Error, Debug)]
pub enum CapabilityError {
    #[error("Unknown {kind}: {name}")]
    UnknownCapability { kind: CapabilityKind, name: String },

    #[error("Invalid arguments for {kind} '{name}': {message}")]
    InvalidArguments {
        kind: CapabilityKind,
        name: String,
        message: String,
    },

    #[error("Error executing {kind} '{name}': {message}")]
    CapabilityExecutionFailed {
        kind: CapabilityKind,
        name: String,
        message: String,
    },

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Failed to load capability unit {unit}: {reason}")]
    UnitLoadFailed { unit: String, reason: String },

    #[error("Settings error: {0}")]
    SettingsError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

impl CapabilityError {
    pub fn unknown(kind: CapabilityKind, name: impl Into<String>) -> Self {
        Self::UnknownCapability {
            kind,
            name: name.into(),
        }
    }

    pub fn invalid_arguments(
        kind: CapabilityKind,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidArguments {
            kind,
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn execution_failed(
        kind: CapabilityKind,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::CapabilityExecutionFailed {
            kind,
            name: name.into(),
            message: message.into(),
        }
    }

    /// True when nothing could be routed for the requested name.
    ///
    /// Resource reads report a miss as `ResourceNotFound`, which counts as
    /// an unknown capability for callers that treat all kinds alike.
    pub fn is_unknown_capability(&self) -> bool {
        matches!(
            self,
            Self::UnknownCapability { .. } | Self::ResourceNotFound(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = CapabilityError::unknown(CapabilityKind::Tool, "nope");
        assert_eq!(err.to_string(), "Unknown tool: nope");

        let err = CapabilityError::execution_failed(CapabilityKind::Prompt, "simple", "boom");
        assert_eq!(err.to_string(), "Error executing prompt 'simple': boom");
    }

    #[test]
    fn test_is_unknown_capability() {
        assert!(CapabilityError::unknown(CapabilityKind::Prompt, "x").is_unknown_capability());
        assert!(CapabilityError::ResourceNotFound("x".into()).is_unknown_capability());
        assert!(!CapabilityError::execution_failed(CapabilityKind::Tool, "x", "y")
            .is_unknown_capability());
    }
}
