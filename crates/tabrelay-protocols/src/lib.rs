//! # tabrelay protocols
//!
//! Shared definitions for the three tabrelay components:
//!
//! - [`wire`]: relay frames exchanged between the host and the browser dispatcher
//! - [`jsonrpc`]: the newline-delimited JSON-RPC dialect spoken over stdio
//! - [`tool`]: tool descriptors and tool call results
//! - [`sink`]: the [`CommandSink`] seam the protocol server sends through

pub mod error;
pub mod jsonrpc;
pub mod sink;
pub mod tool;
pub mod wire;

pub use error::RelayError;
pub use jsonrpc::{RequestId, RpcError, RpcMethod, RpcRequest, RpcResponse, SERVER_ERROR};
pub use sink::CommandSink;
pub use tool::{ToolContent, ToolDescriptor, ToolResult};
pub use wire::{Command, CommandAction, InboundFrame, RelayResponse, TabId};
