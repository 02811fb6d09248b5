//! Error types for the relay node.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that stop the node from starting or running.
///
/// Advisory relay conditions ([`crate::RelayError`]) are logged by the
/// dispatcher and never surface here.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Invalid configuration
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Zenoh communication error
    #[error("Zenoh error: {0}")]
    Zenoh(String),
}
