//! Browser side of the command relay.
//!
//! [`BrowserAgent`] keeps a WebSocket connection to the relay, executes each
//! command it receives against a [`BrowserRuntime`] and answers with exactly
//! one response per command id.
//!
//! The runtime is a trait seam; [`cdp::CdpRuntime`] drives Chrome through its
//! remote debugging endpoint.

mod agent;
pub mod cdp;
mod elements;
mod error;
pub mod eval;
mod executor;
mod runtime;

#[cfg(test)]
mod fake;

pub use agent::{AgentHandle, BrowserAgent};
pub use elements::{ElementInfo, INTERACTIVE_SELECTOR, TEXT_LIMIT, summarize};
pub use error::{EvalError, RuntimeError};
pub use executor::{BRIDGE_ERROR_PREFIX, CommandExecutor};
pub use runtime::{
    BrowserRuntime, JsValue, ObjectModel, ObjectRef, PageContext, RawElement, TabInfo,
};
