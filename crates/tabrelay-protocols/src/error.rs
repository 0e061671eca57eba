//! Relay error taxonomy shared by the relay and its callers.

use std::time::Duration;

use thiserror::Error;

/// Failures of a relay `send`.
#[derive(Debug, Error)]
pub enum RelayError {
    /// No live dispatcher connection after the wait budget was spent.
    #[error(
        "Extension not connected after {attempts} attempts. Ensure the browser dispatcher is running and connected to the relay"
    )]
    ExtensionUnavailable { attempts: u32 },

    /// No response arrived within the request timeout.
    #[error("Extension response timed out after {}ms (request {id})", .timeout.as_millis())]
    RequestTimedOut { id: String, timeout: Duration },

    /// The connection went away between the liveness check and transmission.
    #[error("Extension not connected, try again in a few seconds")]
    Disconnected,

    /// Command could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RelayError {
    /// Whether the failure was caused by the dispatcher not being reachable.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            RelayError::ExtensionUnavailable { .. } | RelayError::Disconnected
        )
    }
}
