//! Error types shared across the crate.

use thiserror::Error;

use crate::registry::NodeId;

/// Errors surfaced to callers of [`crate::QueryService`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The id is not part of the node registry and never will be
    #[error("Node {0} not found")]
    NotFound(NodeId),

    /// No polling cycle has completed yet
    #[error("No polling cycle has completed yet")]
    NotInitialized,

    /// The node's health data cannot be served right now
    #[error("Health data unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Node registry is empty")]
    Empty,

    #[error("Duplicate node id {0} in registry")]
    DuplicateId(NodeId),

    #[error("Local node id {0} is not part of the registry")]
    UnknownLocalNode(NodeId),
}

/// Errors raised while loading, validating or writing configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFailed(#[source] std::io::Error),

    #[error("Failed to write config file: {0}")]
    WriteFailed(#[source] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseFailed(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeFailed(#[from] toml::ser::Error),

    #[error("No config path available (neither XDG_CONFIG_HOME nor HOME is set)")]
    ConfigPathUnavailable,

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
