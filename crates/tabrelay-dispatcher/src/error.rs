//! Dispatcher error types.

use tabrelay_protocols::TabId;
use thiserror::Error;

use crate::cdp::CdpError;

/// Failures reported by a browser runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// No element matched the selector.
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// The tab id does not name an open tab.
    #[error("No tab with id: {0}")]
    TabNotFound(TabId),

    /// A script running in the page threw.
    #[error("{0}")]
    Script(String),

    /// The DevTools connection failed.
    #[error(transparent)]
    Cdp(CdpError),
}

impl From<CdpError> for RuntimeError {
    fn from(e: CdpError) -> Self {
        match e {
            CdpError::JavaScript(message) => RuntimeError::Script(message),
            other => RuntimeError::Cdp(other),
        }
    }
}

impl RuntimeError {
    /// Whether the failure happened inside the page rather than in transport.
    pub fn is_in_page(&self) -> bool {
        matches!(self, RuntimeError::Script(_))
    }
}

/// Failures while evaluating a dotted-path expression.
#[derive(Debug, Error)]
pub enum EvalError {
    /// A path segment resolved to `undefined`.
    #[error("{0} is undefined")]
    UndefinedPath(String),

    /// A segment was read from `null`.
    #[error("Cannot read properties of null (reading '{0}')")]
    NullDereference(String),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl EvalError {
    /// Whether the failure should be reported as an evaluation result
    /// instead of a command error.
    pub fn is_in_page(&self) -> bool {
        match self {
            EvalError::UndefinedPath(_) | EvalError::NullDereference(_) => true,
            EvalError::Runtime(e) => e.is_in_page(),
        }
    }
}
