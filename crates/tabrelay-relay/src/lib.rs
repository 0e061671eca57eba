//! Host side of the browser command relay.
//!
//! The browser dispatcher connects to [`RelayServer`] over WebSocket. Commands
//! sent through [`RelayEndpoint::send`] are tagged with a fresh id, written to
//! the live connection and matched against the dispatcher's responses.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tabrelay_relay::{RelayEndpoint, RelayServer};
//!
//! let relay = Arc::new(RelayEndpoint::new(config.relay.clone()));
//! RelayServer::bind(relay.clone()).await?.spawn();
//!
//! let response = relay.send(CommandAction::ListTabs).await?;
//! ```

mod endpoint;
mod pending;
mod server;
mod session;

pub use endpoint::{RelayEndpoint, RelayStatus};
pub use pending::PendingTable;
pub use server::{RelayServer, create_router};
pub use session::RelaySession;
