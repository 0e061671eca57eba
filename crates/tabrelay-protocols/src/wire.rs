//! Relay wire frames.
//!
//! Outbound (host → browser) frames are [`Command`]s:
//!
//! ```json
//! {"id": "6f1c…", "action": "click", "tabId": 7, "selector": "#submit"}
//! ```
//!
//! Inbound (browser → host) frames are either a [`RelayResponse`] or a
//! heartbeat (`{"type": "heartbeat"}`), modelled together as [`InboundFrame`].

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Browser tab identifier as assigned by the browser runtime.
pub type TabId = i64;

/// Value of the `type` field that marks a heartbeat frame.
pub const HEARTBEAT_TYPE: &str = "heartbeat";

/// Action-specific part of a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CommandAction {
    /// Enumerate open tabs.
    ListTabs,
    /// Activate the first element matching `selector`.
    Click {
        #[serde(rename = "tabId", deserialize_with = "de_tab_id")]
        tab_id: TabId,
        selector: String,
    },
    /// Evaluate a dotted-path expression in the tab.
    Eval {
        #[serde(rename = "tabId", deserialize_with = "de_tab_id")]
        tab_id: TabId,
        code: String,
    },
    /// Enumerate interactive elements in the tab.
    GetElements {
        #[serde(rename = "tabId", deserialize_with = "de_tab_id")]
        tab_id: TabId,
    },
}

impl CommandAction {
    /// Wire names of every supported action.
    pub const NAMES: [&'static str; 4] = ["list_tabs", "click", "eval", "get_elements"];

    /// Whether `name` is a supported action.
    pub fn is_known(name: &str) -> bool {
        Self::NAMES.contains(&name)
    }

    /// Wire name of the action.
    pub fn name(&self) -> &'static str {
        match self {
            CommandAction::ListTabs => "list_tabs",
            CommandAction::Click { .. } => "click",
            CommandAction::Eval { .. } => "eval",
            CommandAction::GetElements { .. } => "get_elements",
        }
    }

    /// Tab the action targets, if any.
    pub fn tab_id(&self) -> Option<TabId> {
        match self {
            CommandAction::ListTabs => None,
            CommandAction::Click { tab_id, .. }
            | CommandAction::Eval { tab_id, .. }
            | CommandAction::GetElements { tab_id } => Some(*tab_id),
        }
    }
}

/// A correlated command sent from the relay to the browser dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub id: String,
    #[serde(flatten)]
    pub action: CommandAction,
}

impl Command {
    pub fn new(id: impl Into<String>, action: CommandAction) -> Self {
        Self {
            id: id.into(),
            action,
        }
    }

    /// Encode as a text frame.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Reply to a [`Command`], correlated by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayResponse {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RelayResponse {
    pub fn success(id: impl Into<String>, result: Value) -> Self {
        Self {
            id: id.into(),
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            result: None,
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Encode as a text frame.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// A frame received by the relay from the browser dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// Liveness ping; never correlated to a pending request.
    Heartbeat,
    /// Reply to a previously sent command.
    Response(RelayResponse),
}

impl InboundFrame {
    /// Decode a text frame.
    ///
    /// Heartbeats are recognised by their `type` tag before any attempt is made
    /// to read an `id`, so they can never be mistaken for a response.
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(text)?;
        if value.get("type").and_then(Value::as_str) == Some(HEARTBEAT_TYPE) {
            return Ok(InboundFrame::Heartbeat);
        }
        let response: RelayResponse = serde_json::from_value(value)?;
        Ok(InboundFrame::Response(response))
    }

    /// Encoded heartbeat frame.
    pub fn heartbeat() -> String {
        serde_json::json!({ "type": HEARTBEAT_TYPE }).to_string()
    }
}

/// Accept a tab id given either as a JSON number or as a numeric string.
fn de_tab_id<'de, D>(deserializer: D) -> Result<TabId, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTabId {
        Number(i64),
        Text(String),
    }

    match RawTabId::deserialize(deserializer)? {
        RawTabId::Number(n) => Ok(n),
        RawTabId::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid tabId: {s:?}"))),
    }
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
