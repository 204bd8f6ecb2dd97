//! Error types for the device layer

use serde_json::Value;
use thiserror::Error;

/// Device layer error types
#[derive(Debug, Error)]
pub enum PrintError {
    /// Network connection error
    #[error("Connection failed: {0}")]
    Connection(String),

    /// IO error while talking to a device
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Timeout waiting for a device
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Invalid device configuration
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Device enumeration failed; carries the collaborator's payload
    #[error("Discovery failed: {0}")]
    Discovery(Value),

    /// The device channel reported an error; carries the raw payload
    #[error("Transport error: {0}")]
    Transport(Value),

    /// The device lacks the capability for the requested operation
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl PrintError {
    /// Raw payload to surface to callers as error detail
    pub fn detail(&self) -> Value {
        match self {
            Self::Discovery(v) | Self::Transport(v) => v.clone(),
            other => Value::String(other.to_string()),
        }
    }

    pub fn transport(payload: impl Into<Value>) -> Self {
        Self::Transport(payload.into())
    }
}

/// Result type for device operations
pub type PrintResult<T> = Result<T, PrintError>;
