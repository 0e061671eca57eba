//! Chrome DevTools Protocol runtime.
//!
//! Start Chrome with remote debugging enabled and point the dispatcher at it:
//!
//! ```bash
//! chrome --remote-debugging-port=9222
//! tabrelay agent --cdp-endpoint http://127.0.0.1:9222
//! ```

mod client;
mod error;
mod protocol;
mod runtime;

pub use client::{CdpClient, CdpSession};
pub use error::CdpError;
pub use protocol::{RemoteObject, TargetInfo};
pub use runtime::{CdpPage, CdpRuntime};
