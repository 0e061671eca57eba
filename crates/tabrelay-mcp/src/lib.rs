//! # tabrelay mcp
//!
//! Stdio JSON-RPC server that exposes the browser as a set of tools.
//!
//! Each `tools/call` becomes exactly one relay command sent through a
//! [`CommandSink`](tabrelay_protocols::CommandSink); the dispatcher's answer
//! is returned as a single text content block holding its JSON rendering.
//!
//! ```no_run
//! # async fn demo(sink: std::sync::Arc<dyn tabrelay_protocols::CommandSink>) {
//! use tabrelay_config::ServerConfig;
//! use tabrelay_mcp::McpServer;
//!
//! McpServer::new(ServerConfig::default(), sink)
//!     .serve_stdio()
//!     .await
//!     .unwrap();
//! # }
//! ```

mod catalog;
mod error;
mod server;
mod tools;

pub use catalog::{CLICK, EVAL, GET_ELEMENTS, GET_TEXT, LIST_TABS, WAIT_READY, tool_catalog};
pub use error::McpServerError;
pub use server::McpServer;
pub use tools::{PAGE_TEXT_EXPRESSION, ToolCall, ToolDispatcher};
