//! Protocol server errors.

use tabrelay_protocols::{RelayError, RpcError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum McpServerError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error(transparent)]
    Relay(#[from] RelayError),

    /// Error reported by the browser dispatcher for a command.
    #[error("{0}")]
    Browser(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl McpServerError {
    /// JSON-RPC error object for this failure.
    pub fn to_rpc_error(&self) -> RpcError {
        RpcError::server(self.to_string())
    }
}
