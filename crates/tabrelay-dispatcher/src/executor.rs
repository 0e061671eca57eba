//! Executes relay commands against a [`BrowserRuntime`].

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, warn};

use tabrelay_protocols::{Command, CommandAction, RelayResponse, TabId};

use crate::elements;
use crate::error::{EvalError, RuntimeError};
use crate::eval;
use crate::runtime::BrowserRuntime;

/// Prefix of eval results that describe an in-page failure.
pub const BRIDGE_ERROR_PREFIX: &str = "Bridge Error: ";

/// Turns command frames into response frames.
pub struct CommandExecutor {
    runtime: Arc<dyn BrowserRuntime>,
}

impl CommandExecutor {
    pub fn new(runtime: Arc<dyn BrowserRuntime>) -> Self {
        Self { runtime }
    }

    /// Decode and execute one text frame.
    ///
    /// Returns `None` for frames that cannot be answered (not JSON, or no
    /// string `id`). Frames with an id always get exactly one response.
    pub async fn handle_frame(&self, text: &str) -> Option<RelayResponse> {
        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                warn!("Ignoring malformed command frame: {}", e);
                return None;
            }
        };
        let Some(id) = value.get("id").and_then(Value::as_str).map(str::to_string) else {
            warn!("Ignoring command frame without id");
            return None;
        };

        let action = value.get("action").and_then(Value::as_str).unwrap_or_default().to_string();
        if !CommandAction::is_known(&action) {
            warn!(%id, action, "Unsupported action");
            return Some(RelayResponse::failure(id, format!("Unsupported action: {action}")));
        }

        match serde_json::from_value::<Command>(value) {
            Ok(command) => Some(self.execute(command).await),
            Err(e) => {
                warn!(%id, action, "Invalid command parameters: {}", e);
                Some(RelayResponse::failure(id, format!("Invalid command: {e}")))
            }
        }
    }

    /// Execute a decoded command.
    pub async fn execute(&self, command: Command) -> RelayResponse {
        let Command { id, action } = command;
        debug!(%id, action = action.name(), tab = ?action.tab_id(), "Executing command");

        let outcome = match action {
            CommandAction::ListTabs => self.list_tabs().await,
            CommandAction::Click { tab_id, selector } => {
                self.click(tab_id, &selector).await.map(|()| json!("ok"))
            }
            CommandAction::Eval { tab_id, code } => self.eval(tab_id, &code).await,
            CommandAction::GetElements { tab_id } => self.get_elements(tab_id).await,
        };

        match outcome {
            Ok(result) => RelayResponse::success(id, result),
            Err(e) => {
                warn!(%id, "Command failed: {}", e);
                RelayResponse::failure(id, e.to_string())
            }
        }
    }

    async fn list_tabs(&self) -> Result<Value, RuntimeError> {
        let tabs = self.runtime.list_tabs().await?;
        Ok(json!(tabs))
    }

    async fn click(&self, tab_id: TabId, selector: &str) -> Result<(), RuntimeError> {
        let page = self.runtime.page(tab_id).await?;
        page.click(selector).await
    }

    /// In-page failures become a `Bridge Error` result, not a command error.
    async fn eval(&self, tab_id: TabId, code: &str) -> Result<Value, RuntimeError> {
        let page = self.runtime.page(tab_id).await?;
        match eval::evaluate(page.as_ref(), code).await {
            Ok(value) => Ok(value),
            Err(EvalError::Runtime(e)) if !e.is_in_page() => Err(e),
            Err(e) => Ok(json!(format!("{BRIDGE_ERROR_PREFIX}{e}"))),
        }
    }

    async fn get_elements(&self, tab_id: TabId) -> Result<Value, RuntimeError> {
        let page = self.runtime.page(tab_id).await?;
        let raw = page.interactive_elements().await?;
        Ok(json!(elements::summarize(raw)))
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
