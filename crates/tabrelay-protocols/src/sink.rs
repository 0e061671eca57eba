//! Command sink seam between the protocol server and the relay.

use async_trait::async_trait;

use crate::error::RelayError;
use crate::wire::{CommandAction, RelayResponse};

/// Something that can deliver a command to the browser dispatcher and wait
/// for the correlated response.
#[async_trait]
pub trait CommandSink: Send + Sync {
    /// Send one command and wait for its response.
    async fn send(&self, action: CommandAction) -> Result<RelayResponse, RelayError>;
}
