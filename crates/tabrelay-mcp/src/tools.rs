//! Mapping from tool calls to relay commands.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::debug;

use tabrelay_protocols::{CommandAction, CommandSink, TabId, ToolResult};

use crate::catalog;
use crate::error::McpServerError;

/// Expression used by `browser_get_text`.
pub const PAGE_TEXT_EXPRESSION: &str = "document.body.innerText";

/// A validated tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    WaitReady,
    ListTabs,
    Click { tab_id: TabId, selector: String },
    Eval { tab_id: TabId, code: String },
    GetElements { tab_id: TabId },
    GetText { tab_id: TabId },
}

impl ToolCall {
    /// Validate `arguments` for the tool called `name`.
    pub fn parse(name: &str, arguments: &Value) -> Result<Self, McpServerError> {
        let args = Arguments(arguments);
        let call = match name {
            catalog::WAIT_READY => ToolCall::WaitReady,
            catalog::LIST_TABS => ToolCall::ListTabs,
            catalog::CLICK => ToolCall::Click {
                tab_id: args.tab_id()?,
                selector: args.string("selector")?,
            },
            catalog::EVAL => ToolCall::Eval {
                tab_id: args.tab_id()?,
                code: args.string("code")?,
            },
            catalog::GET_ELEMENTS => ToolCall::GetElements {
                tab_id: args.tab_id()?,
            },
            catalog::GET_TEXT => ToolCall::GetText {
                tab_id: args.tab_id()?,
            },
            other => return Err(McpServerError::UnknownTool(other.to_string())),
        };
        Ok(call)
    }

    /// The relay command carrying out this call.
    ///
    /// Waiting for readiness is a tab listing: the relay's connection wait
    /// does the waiting and a successful round trip proves the dispatcher
    /// answers.
    pub fn action(&self) -> CommandAction {
        match self {
            ToolCall::WaitReady | ToolCall::ListTabs => CommandAction::ListTabs,
            ToolCall::Click { tab_id, selector } => CommandAction::Click {
                tab_id: *tab_id,
                selector: selector.clone(),
            },
            ToolCall::Eval { tab_id, code } => CommandAction::Eval {
                tab_id: *tab_id,
                code: code.clone(),
            },
            ToolCall::GetElements { tab_id } => CommandAction::GetElements { tab_id: *tab_id },
            ToolCall::GetText { tab_id } => CommandAction::Eval {
                tab_id: *tab_id,
                code: PAGE_TEXT_EXPRESSION.to_string(),
            },
        }
    }

    /// Shape the dispatcher's result for the caller.
    fn present(&self, result: Value) -> Value {
        match self {
            ToolCall::WaitReady => {
                let tab_count = result.as_array().map_or(0, Vec::len);
                json!({"ready": true, "tabCount": tab_count})
            }
            _ => result,
        }
    }
}

/// Accessors over a `tools/call` arguments object.
struct Arguments<'a>(&'a Value);

impl Arguments<'_> {
    fn get(&self, name: &str) -> Result<&Value, McpServerError> {
        self.0
            .get(name)
            .filter(|v| !v.is_null())
            .ok_or_else(|| McpServerError::InvalidArguments(format!("{name} is required")))
    }

    fn string(&self, name: &str) -> Result<String, McpServerError> {
        self.get(name)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| McpServerError::InvalidArguments(format!("{name} must be a string")))
    }

    /// `tabId` as a number, or a string holding one.
    fn tab_id(&self) -> Result<TabId, McpServerError> {
        let value = self.get("tabId")?;
        let parsed = match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        parsed.ok_or_else(|| {
            McpServerError::InvalidArguments(format!("tabId must be a number, got {value}"))
        })
    }
}

/// Executes tool calls through a [`CommandSink`].
pub struct ToolDispatcher {
    sink: Arc<dyn CommandSink>,
}

impl ToolDispatcher {
    pub fn new(sink: Arc<dyn CommandSink>) -> Self {
        Self { sink }
    }

    /// Run one tool call: exactly one command is sent for a valid call.
    pub async fn call(&self, name: &str, arguments: &Value) -> Result<ToolResult, McpServerError> {
        let call = ToolCall::parse(name, arguments)?;
        debug!(tool = name, ?call, "Calling tool");

        let response = self.sink.send(call.action()).await?;
        if let Some(error) = response.error {
            return Err(McpServerError::Browser(error));
        }
        let result = response.result.unwrap_or(Value::Null);
        Ok(ToolResult::json(&call.present(result)))
    }
}

#[cfg(test)]
#[path = "tools_tests.rs"]
mod tests;
