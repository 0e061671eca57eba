//! DevTools protocol messages and the few domain types the runtime reads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::runtime::{JsValue, ObjectRef};

/// Command sent over the browser WebSocket.
#[derive(Debug, Serialize)]
pub struct CdpRequest {
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// Command reply or event.
#[derive(Debug, Deserialize)]
pub struct CdpResponse {
    pub id: Option<u64>,
    pub result: Option<Value>,
    pub error: Option<CdpErrorResponse>,
    pub method: Option<String>,
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CdpErrorResponse {
    pub code: i64,
    pub message: String,
}

/// Entry of `Target.getTargets`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
    pub target_id: String,
    #[serde(rename = "type")]
    pub target_type: String,
    pub title: String,
    pub url: String,
}

impl TargetInfo {
    pub fn is_page(&self) -> bool {
        self.target_type == "page"
    }
}

/// `/json/version` payload. Chrome uses PascalCase names here.
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserVersion {
    #[serde(rename = "Browser")]
    pub browser: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    pub web_socket_debugger_url: String,
}

/// `Runtime.RemoteObject`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObject {
    #[serde(rename = "type")]
    pub object_type: String,
    pub subtype: Option<String>,
    pub value: Option<Value>,
    pub unserializable_value: Option<String>,
    pub description: Option<String>,
    pub object_id: Option<String>,
}

impl RemoteObject {
    pub fn into_js_value(self) -> JsValue {
        if self.object_type == "undefined" {
            return JsValue::Undefined;
        }
        if let Some(object_id) = self.object_id {
            let object = ObjectRef::new(object_id);
            return match self.subtype.as_deref() {
                Some("node") => JsValue::Node(object),
                _ => JsValue::Object(object),
            };
        }
        // NaN, Infinity, -0 and bigints have no JSON form.
        match (self.value, self.unserializable_value) {
            (Some(value), _) => JsValue::Scalar(value),
            (None, Some(text)) => JsValue::Scalar(Value::String(text)),
            (None, None) => JsValue::Scalar(Value::Null),
        }
    }
}

/// `Runtime.ExceptionDetails`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionDetails {
    pub text: String,
    pub exception: Option<RemoteObject>,
}

impl ExceptionDetails {
    /// Message of the thrown error, without the `Uncaught` prefix Chrome adds
    /// to `text`.
    pub fn message(&self) -> String {
        if let Some(Value::String(thrown)) = self.exception.as_ref().and_then(|e| e.value.as_ref()) {
            return thrown.clone();
        }
        let description = self
            .exception
            .as_ref()
            .and_then(|e| e.description.as_deref())
            .and_then(|d| d.lines().next());
        match description {
            Some(line) => match line.split_once(": ") {
                Some((_, message)) => message.to_string(),
                None => line.to_string(),
            },
            None => self.text.clone(),
        }
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
